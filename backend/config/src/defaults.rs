//! Config defaults and post-parse normalization.

use crate::schema::ParleyConfig;

pub const DEFAULT_AGENT_NAME: &str = "HostAgent";
pub const DEFAULT_AGENT_DESCRIPTION: &str = "Delegates tasks to specialised peers.";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_TAG: &str = "session-p2p";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_DESCRIPTOR_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REGISTER_TIMEOUT_SECS: u64 = 5;

/// Upper bound accepted for any outbound timeout.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Fill derived values and normalize lists after parsing.
pub fn apply_all_defaults(config: ParleyConfig) -> ParleyConfig {
    let config = apply_session_defaults(config);
    let config = normalize_peers(config);
    normalize_routes(config)
}

fn apply_session_defaults(mut config: ParleyConfig) -> ParleyConfig {
    if config.session_tag.trim().is_empty() {
        config.session_tag = DEFAULT_SESSION_TAG.to_string();
    }
    config
}

/// Trim, drop trailing slashes and duplicates, keep first-seen order.
fn normalize_peers(mut config: ParleyConfig) -> ParleyConfig {
    let mut seen = Vec::with_capacity(config.peers.len());
    for url in config.peers.drain(..) {
        let url = url.trim().trim_end_matches('/').to_string();
        if !url.is_empty() && !seen.contains(&url) {
            seen.push(url);
        }
    }
    config.peers = seen;
    if let Some(host) = config.host_url.take() {
        let host = host.trim().trim_end_matches('/').to_string();
        config.host_url = (!host.is_empty()).then_some(host);
    }
    config
}

/// Keywords are matched case-insensitively against lowercased task text.
fn normalize_routes(mut config: ParleyConfig) -> ParleyConfig {
    for rule in &mut config.routes {
        rule.keywords = rule
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
    }
    config
}
