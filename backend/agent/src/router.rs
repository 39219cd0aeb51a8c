//! Keyword routing: the reasoning loop used when no model is wired in.
//!
//! Rules are checked in order against the lowercased task text. The first
//! rule with a matching keyword decides whether the task runs on a local
//! skill or is dispatched to a peer.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, instrument};

use parley_acp::PeerRegistry;
use parley_core::ReasoningLoop;

use crate::peer_skills::{ListRemoteAgents, SendTask};
use crate::skill_table::SkillTable;
use crate::skills::{ConvertCurrency, CountProducts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Run a skill from the local table with `{"text": <task>}`.
    Skill(String),
    /// Dispatch the task text to a peer by name.
    Peer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub keywords: Vec<String>,
    pub target: RouteTarget,
}

impl RoutingRule {
    pub fn new<I, S>(keywords: I, target: RouteTarget) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            target,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

pub struct KeywordRouter {
    agent_name: String,
    rules: Vec<RoutingRule>,
    skills: SkillTable,
    registry: Arc<PeerRegistry>,
    fallback_peer: Option<String>,
}

impl KeywordRouter {
    pub fn new(agent_name: impl Into<String>, skills: SkillTable, registry: Arc<PeerRegistry>) -> Self {
        Self {
            agent_name: agent_name.into(),
            rules: Vec::new(),
            skills,
            registry,
            fallback_peer: None,
        }
    }

    pub fn with_rule(mut self, rule: RoutingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = RoutingRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Peer that receives any task no rule matches.
    pub fn with_fallback_peer(mut self, peer: Option<String>) -> Self {
        self.fallback_peer = peer.filter(|p| !p.trim().is_empty());
        self
    }

    /// Target chosen for a task, if any rule or the fallback applies.
    pub fn route(&self, task: &str) -> Option<RouteTarget> {
        let lowered = task.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.target.clone())
            .or_else(|| self.fallback_peer.clone().map(RouteTarget::Peer))
    }

    fn decline(&self) -> String {
        format!(
            "I am {}, and I am not the right specialist for that request.",
            self.agent_name
        )
    }
}

#[async_trait]
impl ReasoningLoop for KeywordRouter {
    #[instrument(skip(self, task), fields(agent = %self.agent_name))]
    async fn invoke(&self, task: &str, session_id: &str) -> Result<String> {
        match self.route(task) {
            Some(RouteTarget::Skill(name)) => {
                debug!(skill = %name, "Routing task to local skill");
                self.skills.invoke(&name, json!({ "text": task })).await
            }
            Some(RouteTarget::Peer(peer)) => {
                info!(peer = %peer, "Delegating task");
                Ok(self.registry.dispatch(&peer, task).await)
            }
            None => Ok(self.decline()),
        }
    }
}

/// The demo skills plus the peer-facing ones, bound to `registry`.
pub fn default_skill_table(registry: Arc<PeerRegistry>) -> SkillTable {
    SkillTable::new()
        .with(Arc::new(ConvertCurrency))
        .with(Arc::new(CountProducts))
        .with(Arc::new(ListRemoteAgents::new(Arc::clone(&registry))))
        .with(Arc::new(SendTask::new(registry)))
}
