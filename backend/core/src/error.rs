use thiserror::Error;

/// Error kinds of the delegation protocol.
///
/// None of these is fatal to a serving agent: client-side kinds become 400
/// responses at the gateway, peer-side kinds become in-band text at dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegationError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("peer unreachable at {url}: {reason}")]
    PeerUnreachable { url: String, reason: String },

    #[error("protocol error from {url}: {reason}")]
    Protocol { url: String, reason: String },

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

pub type DelegationResult<T> = Result<T, DelegationError>;

impl DelegationError {
    pub fn unreachable(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::PeerUnreachable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Protocol {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// JSON-RPC error code reported for this error.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::MalformedRequest(_) => -32600,
            Self::UnsupportedMethod(_) => -32601,
            Self::Validation(_) => -32602,
            Self::PeerUnreachable { .. } | Self::Protocol { .. } => -32603,
        }
    }
}
