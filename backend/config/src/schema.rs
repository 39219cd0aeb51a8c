//! Parley agent configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section may be omitted;
//! missing values fall back to the constants in [`crate::defaults`].

use serde::{Deserialize, Serialize};

use parley_core::{AgentCapabilities, AgentDescriptor, DelegationResult};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration of one agent process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleyConfig {
    /// Identity published in the agent descriptor
    pub agent: AgentSection,

    /// HTTP listener
    pub server: ServerSection,

    /// Seed URLs fetched at start-up
    pub peers: Vec<String>,

    /// Host to announce this agent to once the listener is up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_url: Option<String>,

    /// Outbound call bounds
    pub timeouts: TimeoutSection,

    /// Session id used for peer-to-peer dispatches
    pub session_tag: String,

    /// Keyword routing rules, first match wins
    pub routes: Vec<RouteRule>,

    /// Peer that receives tasks no rule matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_peer: Option<String>,

    pub logging: LoggingSection,
}

impl ParleyConfig {
    /// Address peers use to reach this agent.
    pub fn public_url(&self) -> String {
        self.agent
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
    }

    /// Build this agent's own descriptor.
    pub fn descriptor(&self) -> DelegationResult<AgentDescriptor> {
        Ok(AgentDescriptor::new(&self.agent.name, self.public_url())?
            .with_version(&self.agent.version)
            .with_description(&self.agent.description)
            .with_capabilities(self.agent.capabilities.clone()))
    }
}

// ---------------------------------------------------------------------------
// Agent identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSection {
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    pub capabilities: AgentCapabilities,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: defaults::DEFAULT_AGENT_NAME.to_string(),
            description: defaults::DEFAULT_AGENT_DESCRIPTION.to_string(),
            version: parley_core::descriptor::DEFAULT_VERSION.to_string(),
            public_url: None,
            capabilities: AgentCapabilities::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: defaults::DEFAULT_BIND.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutSection {
    pub descriptor_secs: u64,
    pub rpc_secs: u64,
    pub register_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            descriptor_secs: defaults::DEFAULT_DESCRIPTOR_TIMEOUT_SECS,
            rpc_secs: defaults::DEFAULT_RPC_TIMEOUT_SECS,
            register_secs: defaults::DEFAULT_REGISTER_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// One keyword rule. Exactly one of `skill` / `delegate` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSection {
    pub level: String,
    /// Directory for rolling JSON log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let cfg: ParleyConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.agent.name, "HostAgent");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.timeouts.rpc_secs, 60);
        assert_eq!(cfg.session_tag, "");
        assert_eq!(cfg.public_url(), "http://localhost:8000");
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
agent:
  name: CurrencyAgent
  description: Converts currencies.
  publicUrl: http://fx.internal:8002
  capabilities:
    streaming: false
    pushNotifications: true
server:
  port: 8002
peers:
  - http://localhost:8000
hostUrl: http://localhost:8000
timeouts:
  rpcSecs: 30
routes:
  - keywords: [convert, exchange]
    skill: convert_currency
  - keywords: [inventory, stock]
    delegate: DatabaseAgent
fallbackPeer: HostAgent
"#;
        let cfg: ParleyConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.timeouts.rpc_secs, 30);
        assert_eq!(cfg.timeouts.descriptor_secs, 10);
        assert_eq!(cfg.routes.len(), 2);
        assert_eq!(cfg.routes[1].delegate.as_deref(), Some("DatabaseAgent"));

        let d = cfg.descriptor().unwrap();
        assert_eq!(d.name(), "CurrencyAgent");
        assert_eq!(d.url(), "http://fx.internal:8002");
        assert!(d.capabilities().push_notifications);
    }
}
