//! Engine state machine types.

use serde::{Deserialize, Serialize};

use crate::types::MonitorConfig;

/// The current state of the monitoring engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum EngineState {
    /// Engine is idle, neither polling nor broadcasting.
    #[default]
    Idle,

    /// Engine is starting up.
    Starting {
        /// Current startup phase.
        phase: StartupPhase,
    },

    /// Engine is polling and broadcasting.
    Live {
        /// Active monitor configuration.
        config: MonitorConfig,
    },

    /// Engine is stopping.
    Stopping {
        /// Reason for stopping.
        reason: StopReason,

        /// Current shutdown phase.
        phase: ShutdownPhase,
    },

    /// Engine encountered an error during startup.
    Error {
        /// Error message.
        message: String,

        /// Whether recovery is possible.
        recoverable: bool,
    },
}

impl EngineState {
    /// Returns true if the engine is in the Idle state.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the engine is currently live.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Returns true if the engine is starting.
    pub fn is_starting(&self) -> bool {
        matches!(self, Self::Starting { .. })
    }

    /// Returns true if the engine is stopping.
    pub fn is_stopping(&self) -> bool {
        matches!(self, Self::Stopping { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting { .. } => "Starting",
            Self::Live { .. } => "Live",
            Self::Stopping { .. } => "Stopping",
            Self::Error { .. } => "Error",
        }
    }
}

/// Startup phases for the engine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupPhase {
    /// Starting the status poller.
    StartPoller,

    /// Creating the broadcast sender (SDK init + connection + buffer).
    CreateSender,

    /// Starting the frame timer loop.
    StartFrameLoop,
}

impl StartupPhase {
    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::StartPoller => Some(Self::CreateSender),
            Self::CreateSender => Some(Self::StartFrameLoop),
            Self::StartFrameLoop => None,
        }
    }

    /// Returns the previous phase, if any (for rollback).
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::StartPoller => None,
            Self::CreateSender => Some(Self::StartPoller),
            Self::StartFrameLoop => Some(Self::CreateSender),
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::StartPoller => "Starting status poller",
            Self::CreateSender => "Connecting broadcast sender",
            Self::StartFrameLoop => "Starting frame timer",
        }
    }
}

/// Shutdown phases for the engine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownPhase {
    /// Stopping the frame timer loop.
    StopFrameLoop,

    /// Stopping the broadcast sender.
    StopSender,

    /// Stopping the status poller.
    StopPoller,
}

impl ShutdownPhase {
    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::StopFrameLoop => Some(Self::StopSender),
            Self::StopSender => Some(Self::StopPoller),
            Self::StopPoller => None,
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::StopFrameLoop => "Stopping frame timer",
            Self::StopSender => "Disconnecting sender",
            Self::StopPoller => "Stopping poller",
        }
    }
}

/// Reason for stopping the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StopReason {
    /// User requested stop.
    UserRequested,

    /// Fatal error occurred.
    FatalError { message: String },
}

impl StopReason {
    /// Returns a display message for this reason.
    pub fn message(&self) -> String {
        match self {
            Self::UserRequested => "Monitor stopped by user".to_string(),
            Self::FatalError { message } => format!("Fatal error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_phases_are_ordered_and_reversible() {
        let mut phase = StartupPhase::StartPoller;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }

        assert_eq!(
            seen,
            vec![
                StartupPhase::StartPoller,
                StartupPhase::CreateSender,
                StartupPhase::StartFrameLoop,
            ]
        );

        while let Some(prev) = phase.previous() {
            assert_eq!(prev.next(), Some(phase));
            phase = prev;
        }
        assert_eq!(phase, StartupPhase::StartPoller);
    }
}
