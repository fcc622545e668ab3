//! Cached resolution state for the monitored channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::resolver::ChannelIdentity;

/// Cached resolution state: the resolved identity plus the last video the
/// poller observed live.
///
/// Both parts are wiped together whenever the input identifier changes;
/// the epoch counter lets an in-flight poll detect that its results belong
/// to a channel that is no longer monitored.
#[derive(Debug, Default)]
pub struct ChannelCache {
    input_identifier: String,
    identity: Option<ChannelIdentity>,
    last_live_video_id: Option<String>,
    epoch: u64,
}

/// Shared handle to the channel cache.
///
/// The poller is the only writer of identity and poll-cache state; the
/// engine writes only through [`CacheHandle::set_identifier`].
#[derive(Debug, Clone, Default)]
pub struct CacheHandle {
    inner: Arc<Mutex<ChannelCache>>,
}

impl CacheHandle {
    /// Create a cache seeded with the given identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelCache {
                input_identifier: identifier.into(),
                ..ChannelCache::default()
            })),
        }
    }

    /// Replace the monitored identifier, invalidating the resolved
    /// identity and the poll cache entry as one atomic operation.
    ///
    /// A no-op when the identifier is unchanged.
    pub fn set_identifier(&self, identifier: impl Into<String>) {
        let identifier = identifier.into();
        let mut cache = self.inner.lock();
        if cache.input_identifier == identifier {
            return;
        }

        debug!(identifier, "Channel identifier changed, invalidating cache");
        cache.input_identifier = identifier;
        cache.identity = None;
        cache.last_live_video_id = None;
        cache.epoch = cache.epoch.wrapping_add(1);
    }

    /// Current invalidation epoch.
    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Current input identifier.
    pub fn input_identifier(&self) -> String {
        self.inner.lock().input_identifier.clone()
    }

    /// The resolved identity, if any.
    pub fn identity(&self) -> Option<ChannelIdentity> {
        self.inner.lock().identity.clone()
    }

    /// The last video observed live, if any.
    pub fn last_live_video_id(&self) -> Option<String> {
        self.inner.lock().last_live_video_id.clone()
    }

    /// Store a resolved identity, unless the epoch moved while the
    /// resolution was in flight. Returns whether the write happened.
    pub fn store_identity(&self, epoch: u64, identity: ChannelIdentity) -> bool {
        let mut cache = self.inner.lock();
        if cache.epoch != epoch {
            debug!("Discarding stale identity resolution");
            return false;
        }
        cache.identity = Some(identity);
        true
    }

    /// Remember a video observed live, unless the epoch moved. Returns
    /// whether the write happened.
    pub fn set_live_video(&self, epoch: u64, video_id: String) -> bool {
        let mut cache = self.inner.lock();
        if cache.epoch != epoch {
            debug!("Discarding stale live-video observation");
            return false;
        }
        cache.last_live_video_id = Some(video_id);
        true
    }

    /// Clear the last-live-video entry, unless the epoch moved.
    pub fn clear_live_video(&self, epoch: u64) {
        let mut cache = self.inner.lock();
        if cache.epoch == epoch {
            cache.last_live_video_id = None;
        }
    }
}
