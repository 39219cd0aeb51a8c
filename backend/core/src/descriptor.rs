//! Agent descriptor: the self-description document every agent publishes.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::error::{DelegationError, DelegationResult};

pub const DEFAULT_VERSION: &str = "0.1.0";
pub const DEFAULT_DESCRIPTION: &str = "No description.";

/// Feature flags an agent declares. Unknown flags read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(default)]
    pub state_transition_history: bool,
    /// Flags outside the well-known set. Non-boolean entries are dropped.
    #[serde(flatten, deserialize_with = "boolean_flags")]
    pub extra: BTreeMap<String, bool>,
}

fn boolean_flags<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| value.as_bool().map(|flag| (name, flag)))
        .collect())
}

impl AgentCapabilities {
    /// Set an arbitrary flag by its wire name.
    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        match name {
            "streaming" => self.streaming = value,
            "pushNotifications" => self.push_notifications = value,
            "stateTransitionHistory" => self.state_transition_history = value,
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
        self
    }

    pub fn supports(&self, name: &str) -> bool {
        match name {
            "streaming" => self.streaming,
            "pushNotifications" => self.push_notifications,
            "stateTransitionHistory" => self.state_transition_history,
            other => self.extra.get(other).copied().unwrap_or(false),
        }
    }
}

/// Identity, address and capabilities of one agent.
///
/// Immutable once built; a newer descriptor for the same name replaces the
/// old one wholesale. Equality is structural over every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct AgentDescriptor {
    name: String,
    url: String,
    version: String,
    description: String,
    capabilities: AgentCapabilities,
}

/// Wire shape before defaults and validation are applied.
#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    capabilities: Option<AgentCapabilities>,
}

impl TryFrom<RawDescriptor> for AgentDescriptor {
    type Error = DelegationError;

    fn try_from(raw: RawDescriptor) -> DelegationResult<Self> {
        let mut descriptor = Self::new(
            raw.name.unwrap_or_default(),
            raw.url.unwrap_or_default(),
        )?;
        if let Some(version) = raw.version {
            descriptor.version = version;
        }
        if let Some(description) = raw.description {
            descriptor.description = description;
        }
        if let Some(capabilities) = raw.capabilities {
            descriptor.capabilities = capabilities;
        }
        Ok(descriptor)
    }
}

impl AgentDescriptor {
    /// Build a descriptor with default version, description and capabilities.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> DelegationResult<Self> {
        let name = name.into().trim().to_string();
        let url = url.into().trim().to_string();
        if name.is_empty() {
            return Err(DelegationError::Validation(
                "descriptor name must not be empty".into(),
            ));
        }
        if url.is_empty() {
            return Err(DelegationError::Validation(format!(
                "descriptor url for '{name}' must not be empty"
            )));
        }
        Ok(Self {
            name,
            url,
            version: DEFAULT_VERSION.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            capabilities: AgentCapabilities::default(),
        })
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Parse and validate a descriptor from its JSON mapping.
    pub fn from_value(value: Value) -> DelegationResult<Self> {
        let raw: RawDescriptor = serde_json::from_value(value)
            .map_err(|e| DelegationError::Validation(format!("invalid descriptor: {e}")))?;
        raw.try_into()
    }

    /// Canonical JSON mapping of this descriptor.
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "url": self.url,
            "version": self.version,
            "description": self.description,
            "capabilities": self.capabilities,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL at which the agent is reachable.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn capabilities(&self) -> &AgentCapabilities {
        &self.capabilities
    }
}
