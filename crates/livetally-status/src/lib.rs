//! Live-status resolution and polling.
//!
//! This crate owns the remote-API side of the monitor: resolving a
//! user-supplied channel identifier to a canonical identity, and the
//! timer-driven poller that decides each tick how to check liveness while
//! spending as little of the remote call budget as possible.

mod api;
mod cache;
mod client;
mod error;
mod poller;
mod resolver;

pub use api::{ChannelResource, StatusApi, VideoDetail};
pub use cache::{CacheHandle, ChannelCache};
pub use client::YouTubeClient;
pub use error::{PollError, StatusError};
pub use poller::{PollerHandle, StatusPoller, TickReport};
pub use resolver::{resolve, ChannelIdentity};

/// Canonical channel ID prefix. Dispatch between the by-ID and by-handle
/// resolution paths is decided by this prefix alone.
pub const CHANNEL_ID_PREFIX: &str = "UC";

/// Result type for status operations.
pub type StatusResult<T> = Result<T, StatusError>;
