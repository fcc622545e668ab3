//! Typed shell<->engine messages for the tally monitor.
//!
//! This crate defines all the message types used for communication between
//! the application shell and the monitoring engine.

mod commands;
mod events;
mod state;
mod types;

pub use commands::EngineCommand;
pub use events::{EngineEvent, StatusErrorKind};
pub use state::{EngineState, ShutdownPhase, StartupPhase, StopReason};
pub use types::{LiveStatus, MonitorConfig, PollIntervalPolicy};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (Shell → Engine).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (Engine → Shell).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<EngineCommand>, Receiver<EngineCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
