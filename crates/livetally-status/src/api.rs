//! The remote status API seam.
//!
//! Four query shapes are consumed: resolve-by-ID, resolve-by-handle,
//! fetch-most-recent-upload, and fetch-video-detail. Each is a single
//! awaitable operation with a canonical success/error result; no callback
//! machinery leaks above this trait.

use async_trait::async_trait;

use crate::StatusResult;

/// A channel resource as returned by the remote API.
///
/// Both fields are optional because the remote side may return a partial
/// resource; the resolver decides what counts as unresolvable.
#[derive(Debug, Clone, Default)]
pub struct ChannelResource {
    /// Canonical channel ID.
    pub channel_id: Option<String>,

    /// ID of the channel's "recent uploads" collection.
    pub uploads_collection_id: Option<String>,
}

/// Live-streaming detail for a single video.
#[derive(Debug, Clone, Default)]
pub struct VideoDetail {
    /// Video title.
    pub title: String,

    /// Concurrent viewer count, when reported.
    pub concurrent_viewers: u64,

    /// When the stream actually started, if it has.
    pub actual_start_time: Option<String>,

    /// When the stream actually ended, if it has.
    pub actual_end_time: Option<String>,
}

impl VideoDetail {
    /// The canonical liveness rule: a stream is live when it has started
    /// and has not ended. The lifecycle-status enum is deliberately not
    /// consulted; it can lag behind the timestamps.
    pub fn is_live(&self) -> bool {
        self.actual_start_time.is_some() && self.actual_end_time.is_none()
    }
}

/// Awaitable remote status API.
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Fetch a channel resource by canonical ID. `Ok(None)` means the ID
    /// matched nothing.
    async fn channel_by_id(&self, channel_id: &str) -> StatusResult<Option<ChannelResource>>;

    /// Fetch a channel resource by handle (without the leading marker).
    /// `Ok(None)` means the handle matched nothing.
    async fn channel_by_handle(&self, handle: &str) -> StatusResult<Option<ChannelResource>>;

    /// Fetch the ID of the single most recent item in an uploads
    /// collection. `Ok(None)` means the collection is empty.
    async fn latest_upload(&self, uploads_collection_id: &str) -> StatusResult<Option<String>>;

    /// Fetch live-streaming detail for a single video. `Ok(None)` means no
    /// video with that ID exists.
    async fn video_detail(&self, video_id: &str) -> StatusResult<Option<VideoDetail>>;
}
