//! Structured logging for Parley agents.
//!
//! Console and rolling-file output, log redaction, and delegation event records.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{DelegationEvent, EventLogEntry, EventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
