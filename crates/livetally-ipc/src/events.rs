//! Events sent from the engine to the shell.

use serde::{Deserialize, Serialize};

use crate::state::EngineState;
use crate::types::LiveStatus;

/// Classification of a status-poll failure, for shell-side guidance.
///
/// Mirrors the status crate's error taxonomy without dragging transport
/// error types across the IPC boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusErrorKind {
    /// The channel identifier could not be resolved.
    InvalidChannel,

    /// The API credential was rejected.
    InvalidCredential,

    /// The remote call budget is exhausted.
    QuotaExceeded,

    /// Network or transport failure.
    Transport,

    /// Any other remote failure shape.
    Unexpected,
}

/// Events that the engine can send to the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<EngineState>,

        /// Current state.
        current: Box<EngineState>,
    },

    /// A new live-status snapshot was published.
    Status(LiveStatus),

    /// A poll tick failed; the previous snapshot remains valid.
    StatusError {
        /// Failure classification.
        kind: StatusErrorKind,

        /// Human-readable message.
        message: String,
    },

    /// Engine is ready.
    Ready,

    /// Engine has shut down.
    Shutdown,
}
