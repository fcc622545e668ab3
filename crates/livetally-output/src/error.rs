//! Error types for the output module.

use thiserror::Error;

/// Errors that can occur during broadcast output operations.
#[derive(Debug, Error)]
pub enum OutputError {
    /// SDK initialization failed.
    #[error("Broadcast SDK initialization failed: {0}")]
    SdkInit(String),

    /// Creating the broadcast connection handle failed.
    #[error("Failed to create broadcast connection: {0}")]
    ConnectionFailed(String),

    /// Sender already started.
    #[error("Broadcast sender already started")]
    AlreadyStarted,

    /// Send failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// No backend is available in this build.
    #[error("Broadcast backend not supported: {0}")]
    NotSupported(String),
}
