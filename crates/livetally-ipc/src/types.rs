//! Common types used across IPC messages.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll intervals for the status poller.
///
/// The poller re-reads these only when its timer is recreated after an
/// observed live/not-live transition, never mid-tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollIntervalPolicy {
    /// Seconds between polls while the channel is live.
    pub live_interval_secs: f64,

    /// Seconds between polls while the channel is not live.
    pub not_live_interval_secs: f64,
}

impl Default for PollIntervalPolicy {
    fn default() -> Self {
        Self {
            live_interval_secs: 60.0,
            not_live_interval_secs: 300.0,
        }
    }
}

impl PollIntervalPolicy {
    /// Interval to use for the given liveness observation.
    pub fn interval_for(&self, is_live: bool) -> Duration {
        let secs = if is_live {
            self.live_interval_secs
        } else {
            self.not_live_interval_secs
        };
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Configuration for starting the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Channel to monitor: a canonical channel ID ("UC...") or a handle
    /// with or without a leading "@".
    pub channel: String,

    /// Opaque API credential for the remote status API.
    pub api_key: String,

    /// Poll interval policy.
    pub intervals: PollIntervalPolicy,

    /// Name under which the broadcast session is announced.
    pub session_name: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            api_key: String::new(),
            intervals: PollIntervalPolicy::default(),
            session_name: "Live Tally".to_string(),
        }
    }
}

/// The most recent observation of the monitored channel.
///
/// Immutable snapshot, overwritten whole on every successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    /// Whether the channel is currently live.
    pub is_live: bool,

    /// Concurrent viewer count (0 when not live).
    pub viewer_count: u64,

    /// Title of the live video (empty when not live).
    pub title: String,

    /// ID of the live video (empty when not live).
    pub live_video_id: String,
}
