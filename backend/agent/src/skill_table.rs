//! Static table of the skills an agent can run locally.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::debug;

use parley_core::Skill;

#[derive(Default, Clone)]
pub struct SkillTable {
    skills: BTreeMap<String, Arc<dyn Skill>>,
}

impl SkillTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a skill under its own name, replacing any skill of that name.
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        self.skills.insert(skill.name().to_string(), skill);
    }

    pub fn with(mut self, skill: Arc<dyn Skill>) -> Self {
        self.register(skill);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    /// Skill names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.skills.keys().cloned().collect()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<String> {
        let skill = self
            .get(name)
            .ok_or_else(|| anyhow!("no skill named '{name}'"))?;
        debug!(skill = %name, "Invoking skill");
        skill.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Skill for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats its text argument."
        }

        async fn invoke(&self, args: Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn test_invoke_by_name() {
        let table = SkillTable::new().with(Arc::new(Echo));
        assert_eq!(table.names(), vec!["echo"]);
        assert_eq!(table.invoke("echo", json!({"text": "hi"})).await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_unknown_skill_is_error() {
        let table = SkillTable::new();
        let err = table.invoke("missing", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
