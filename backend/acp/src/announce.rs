//! Announcement to a host agent.
//!
//! Once an agent's own listener is up it pushes its descriptor to a host's
//! `POST /register`, so the host can route work to it without a discovery pass.

use std::time::Duration;

use tracing::info;

use parley_core::{AgentDescriptor, DelegationResult};

use crate::client::{PeerLink, PeerLinkConfig};

/// Default bound on the registration POST.
pub const DEFAULT_ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Announcer;

impl Announcer {
    /// Register `descriptor` with the agent at `host_url`.
    pub async fn announce_to(
        host_url: &str,
        descriptor: &AgentDescriptor,
        timeout: Duration,
    ) -> DelegationResult<()> {
        let host = PeerLink::new(host_url, PeerLinkConfig::default())?;
        host.register_descriptor(descriptor, timeout).await?;
        info!(host = %host.base_url(), agent = %descriptor.name(), "Registered with host");
        Ok(())
    }
}
