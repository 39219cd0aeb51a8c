use anyhow::Result;
use async_trait::async_trait;

/// The decision-making collaborator behind an agent's gateway.
///
/// Given a task text it returns the reply text, possibly after dispatching
/// work to peers. Implementations bound their own running time.
#[async_trait]
pub trait ReasoningLoop: Send + Sync {
    async fn invoke(&self, task: &str, session_id: &str) -> Result<String>;
}

/// A named capability an agent can run locally.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique name of the skill (e.g., "convert_currency").
    fn name(&self) -> &str;

    /// Description shown when listing skills.
    fn description(&self) -> &str;

    /// Run the skill with the given arguments.
    async fn invoke(&self, args: serde_json::Value) -> Result<String>;
}
