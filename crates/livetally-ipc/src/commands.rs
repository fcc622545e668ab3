//! Commands sent from the shell to the engine.

use serde::{Deserialize, Serialize};

use crate::types::MonitorConfig;

/// Commands that the shell can send to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Start monitoring and broadcasting with the given configuration.
    Start { config: MonitorConfig },

    /// Stop monitoring and broadcasting.
    Stop,

    /// Change the monitored channel identifier.
    ///
    /// Invalidates the resolved channel identity and the poll cache as one
    /// atomic operation; the next poll tick re-resolves from scratch.
    SetChannel(String),

    /// Request current engine state.
    GetState,

    /// Shutdown the engine completely.
    Shutdown,
}
