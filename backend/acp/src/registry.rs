/// Peer registry: who this agent knows and how to reach them.
///
/// One lock guards the name → entry map. It is held for map access only;
/// every network call happens after the guard is dropped.
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use logging::{DelegationEvent, EventLogger};
use parley_core::{AgentDescriptor, DelegationError, DelegationResult, TaskRequest, TaskResult};

use crate::client::{PeerLink, PeerLinkConfig};

/// Session id used for every peer-to-peer dispatch from this process.
pub const DEFAULT_SESSION_TAG: &str = "session-p2p";

#[derive(Clone)]
struct PeerEntry {
    descriptor: AgentDescriptor,
    link: Arc<PeerLink>,
}

/// Short view of a peer, as offered to a reasoning loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    pub name: String,
    pub url: String,
    pub description: String,
    pub streaming: bool,
}

/// Outcome of a `register_self` pass. Failures never abort the pass.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Names registered, in seed order.
    pub registered: Vec<String>,
    /// Seed URLs that could not be reached or parsed.
    pub failed: Vec<(String, DelegationError)>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No peer named '{0}'.")]
    UnknownPeer(String),

    #[error("Error while calling peer: {0}")]
    Peer(#[from] DelegationError),
}

/// A task a peer answered.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub peer: String,
    pub task_id: String,
    pub result: TaskResult,
}

impl DispatchOutcome {
    /// `state=<state>, result=<raw result JSON>`
    pub fn summary(&self) -> String {
        format!("state={}, result={}", self.result.state, self.result.raw)
    }
}

pub struct PeerRegistry {
    entries: RwLock<HashMap<String, PeerEntry>>,
    http: Client,
    link_config: PeerLinkConfig,
    session_tag: String,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::with_config(PeerLinkConfig::default(), DEFAULT_SESSION_TAG)
    }

    pub fn with_config(link_config: PeerLinkConfig, session_tag: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            http: Client::new(),
            link_config: link_config.clamped(),
            session_tag: session_tag.into(),
        }
    }

    /// Discover peers from seed URLs and register every one that answers.
    ///
    /// Descriptors are fetched concurrently; insertion follows seed order, so
    /// a later seed wins when two seeds report the same name.
    pub async fn register_self(&self, urls: &[String]) -> RegistrationReport {
        let attempts = join_all(urls.iter().map(|url| self.discover(url))).await;

        let mut report = RegistrationReport::default();
        for (url, attempt) in urls.iter().zip(attempts) {
            match attempt {
                Ok((descriptor, link)) => {
                    let name = descriptor.name().to_string();
                    self.insert(descriptor, link).await;
                    report.registered.push(name);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Could not load agent descriptor");
                    report.failed.push((url.clone(), e));
                }
            }
        }
        report
    }

    async fn discover(&self, url: &str) -> DelegationResult<(AgentDescriptor, Arc<PeerLink>)> {
        let link = PeerLink::with_client(url, self.http.clone(), self.link_config)?;
        let descriptor = link.fetch_descriptor().await?;
        Ok((descriptor, Arc::new(link)))
    }

    /// Register a peer that announced itself. Returns the descriptor it
    /// superseded, if any.
    pub async fn accept_registration(
        &self,
        descriptor: AgentDescriptor,
    ) -> DelegationResult<Option<AgentDescriptor>> {
        let link = PeerLink::with_client(descriptor.url(), self.http.clone(), self.link_config)?
            .with_descriptor(descriptor.clone());
        Ok(self.insert(descriptor, Arc::new(link)).await)
    }

    async fn insert(
        &self,
        descriptor: AgentDescriptor,
        link: Arc<PeerLink>,
    ) -> Option<AgentDescriptor> {
        let name = descriptor.name().to_string();
        let url = link.base_url().to_string();
        let previous = {
            let mut entries = self.entries.write().await;
            entries.insert(name.clone(), PeerEntry { descriptor, link })
        };

        info!(peer = %name, url = %url, replaced = previous.is_some(), "Registered peer");
        EventLogger::log_event(
            &self.session_tag,
            DelegationEvent::Registered {
                peer: name,
                url,
                replaced: previous.is_some(),
            },
        );
        previous.map(|entry| entry.descriptor)
    }

    /// Snapshot of every known descriptor, in no particular order.
    pub async fn list_peers(&self) -> Vec<AgentDescriptor> {
        self.entries
            .read()
            .await
            .values()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub async fn peer_summaries(&self) -> Vec<PeerSummary> {
        let mut summaries: Vec<PeerSummary> = self
            .list_peers()
            .await
            .into_iter()
            .map(|d| PeerSummary {
                name: d.name().to_string(),
                url: d.url().to_string(),
                description: d.description().to_string(),
                streaming: d.capabilities().streaming,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub async fn get(&self, name: &str) -> Option<AgentDescriptor> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|e| e.descriptor.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Forward `message` to the named peer and return its answer.
    pub async fn send_task(
        &self,
        name: &str,
        message: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let link = {
            let entries = self.entries.read().await;
            entries
                .get(name)
                .map(|e| Arc::clone(&e.link))
                .ok_or_else(|| DispatchError::UnknownPeer(name.to_string()))?
        };

        let request = TaskRequest::fresh(self.session_tag.clone(), message);
        let result = link.submit_task(&request).await?;

        EventLogger::log_event(
            &self.session_tag,
            DelegationEvent::Dispatched {
                peer: name.to_string(),
                task_id: request.task_id.clone(),
                state: result.state.to_string(),
            },
        );
        Ok(DispatchOutcome {
            peer: name.to_string(),
            task_id: request.task_id,
            result,
        })
    }

    /// Dispatch for callers without a structured error channel.
    ///
    /// Always returns the final text: the peer's result, a "no such peer"
    /// notice, or the error that stopped the call. Callers must not retry.
    pub async fn dispatch(&self, name: &str, message: &str) -> String {
        match self.send_task(name, message).await {
            Ok(outcome) => outcome.summary(),
            Err(e) => {
                if let DispatchError::Peer(err) = &e {
                    warn!(peer = %name, error = %err, "Dispatch failed");
                    EventLogger::log_event(
                        &self.session_tag,
                        DelegationEvent::Error {
                            error_msg: err.to_string(),
                        },
                    );
                }
                e.to_string()
            }
        }
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
