//! Error types for status operations.

use thiserror::Error;

use livetally_ipc::StatusErrorKind;

/// Errors that can occur while resolving or polling channel status.
///
/// Raw remote failures are mapped into this taxonomy at the client
/// boundary; nothing above the resolver/poller sees transport-layer types.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The channel identifier could not be resolved.
    #[error("Channel not found: {0}")]
    InvalidChannel(String),

    /// The API credential was rejected.
    #[error("API credential rejected: {0}")]
    InvalidCredential(String),

    /// The remote call budget is exhausted.
    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Network or transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other remote failure shape.
    #[error("Unexpected API response: {0}")]
    Unexpected(String),
}

impl StatusError {
    /// Classification for IPC events.
    pub fn kind(&self) -> StatusErrorKind {
        match self {
            Self::InvalidChannel(_) => StatusErrorKind::InvalidChannel,
            Self::InvalidCredential(_) => StatusErrorKind::InvalidCredential,
            Self::QuotaExceeded(_) => StatusErrorKind::QuotaExceeded,
            Self::Transport(_) => StatusErrorKind::Transport,
            Self::Unexpected(_) => StatusErrorKind::Unexpected,
        }
    }
}

/// A recorded poll failure, kept in the poller's observable error slot.
///
/// Cloneable snapshot of a [`StatusError`]; the previous live-status
/// snapshot stays valid alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollError {
    /// Failure classification.
    pub kind: StatusErrorKind,

    /// Human-readable message.
    pub message: String,
}

impl From<&StatusError> for PollError {
    fn from(err: &StatusError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
