//! Delegation Event Logger
//!
//! Structured protocol events (registration, dispatch, inbound task, error)
//! emitted through `tracing` under the `delegation_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelegationEvent {
    Registered {
        peer: String,
        url: String,
        replaced: bool,
    },
    Dispatched {
        peer: String,
        task_id: String,
        state: String,
    },
    TaskReceived {
        task_id: String,
        text: String,
    },
    Error {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: DelegationEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact free text in the event, then hand it to the tracing system.
    pub fn log_event(session_id: &str, event: DelegationEvent) {
        let entry = Self::entry(session_id, event);
        info!(target: "delegation_events", event = ?entry, "Delegation event");
    }

    fn entry(session_id: &str, mut event: DelegationEvent) -> EventLogEntry {
        match &mut event {
            DelegationEvent::Registered { url, .. } => {
                *url = redact_sensitive_data(url);
            }
            DelegationEvent::TaskReceived { text, .. } => {
                *text = redact_sensitive_data(text);
            }
            DelegationEvent::Error { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            DelegationEvent::Dispatched { .. } => {}
        }

        EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}
