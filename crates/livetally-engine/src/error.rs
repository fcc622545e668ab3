//! Engine error types.

use thiserror::Error;

/// Errors from constructing the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The async runtime backing the poller could not be created.
    #[error("Failed to create async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
