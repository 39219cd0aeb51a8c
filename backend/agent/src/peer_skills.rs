//! Skills that let a reasoning loop see and use its peers.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use parley_acp::PeerRegistry;
use parley_core::Skill;

/// Lists the known peers as a JSON array of summaries.
pub struct ListRemoteAgents {
    registry: Arc<PeerRegistry>,
}

impl ListRemoteAgents {
    pub fn new(registry: Arc<PeerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Skill for ListRemoteAgents {
    fn name(&self) -> &str {
        "list_remote_agents"
    }

    fn description(&self) -> &str {
        "Lists the peers this agent can delegate tasks to."
    }

    async fn invoke(&self, _args: Value) -> Result<String> {
        let peers = self.registry.peer_summaries().await;
        Ok(serde_json::to_string(&peers)?)
    }
}

/// Sends `{"agent_name", "message"}` to the named peer.
///
/// Failures come back as text so the caller can keep reasoning.
pub struct SendTask {
    registry: Arc<PeerRegistry>,
}

impl SendTask {
    pub fn new(registry: Arc<PeerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Skill for SendTask {
    fn name(&self) -> &str {
        "send_task"
    }

    fn description(&self) -> &str {
        "Delegates a message to a named peer and returns its answer."
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let agent_name = args
            .get("agent_name")
            .and_then(Value::as_str)
            .context("send_task requires 'agent_name'")?;
        let message = args
            .get("message")
            .and_then(Value::as_str)
            .context("send_task requires 'message'")?;
        Ok(self.registry.dispatch(agent_name, message).await)
    }
}
