//! The timer-driven status poller.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use livetally_ipc::{LiveStatus, PollIntervalPolicy};

use crate::api::StatusApi;
use crate::cache::CacheHandle;
use crate::error::{PollError, StatusError};
use crate::resolver::{resolve, ChannelIdentity};

/// What a single poll tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// The snapshot published this tick, if any.
    pub published: Option<LiveStatus>,

    /// The failure recorded this tick, if any.
    pub error: Option<PollError>,

    /// Whether the poll interval was reselected after this tick.
    pub interval_reselected: bool,

    /// Whether the tick's result was discarded because the monitored
    /// identifier changed while a remote call was in flight.
    pub discarded: bool,
}

/// Shared handle to a running poller.
pub struct PollerHandle {
    status_rx: watch::Receiver<LiveStatus>,
    errors: Arc<Mutex<Option<PollError>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl PollerHandle {
    /// Subscribe to live-status snapshots. Any number of receivers may
    /// observe the latest snapshot without locking the poller.
    pub fn subscribe(&self) -> watch::Receiver<LiveStatus> {
        self.status_rx.clone()
    }

    /// Take the most recent poll failure, if one was recorded since the
    /// last call.
    pub fn take_error(&self) -> Option<PollError> {
        self.errors.lock().take()
    }

    /// Tear down the poll timer. Any in-flight tick completes but its
    /// sleep is interrupted immediately.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Timer-driven state machine deciding, each tick, whether to re-check a
/// previously seen live video directly or fall back to scanning the
/// channel's most recent upload.
pub struct StatusPoller {
    api: Arc<dyn StatusApi>,
    cache: CacheHandle,
    policy: PollIntervalPolicy,
    status_tx: watch::Sender<LiveStatus>,
    status_rx: watch::Receiver<LiveStatus>,
    errors: Arc<Mutex<Option<PollError>>>,
    last_is_live: bool,
    current_interval: Duration,
}

impl StatusPoller {
    /// Create a poller over the given API, cache, and interval policy.
    pub fn new(api: Arc<dyn StatusApi>, cache: CacheHandle, policy: PollIntervalPolicy) -> Self {
        let (status_tx, status_rx) = watch::channel(LiveStatus::default());

        Self {
            api,
            cache,
            policy,
            status_tx,
            status_rx,
            errors: Arc::new(Mutex::new(None)),
            last_is_live: false,
            current_interval: policy.interval_for(false),
        }
    }

    /// The interval the tick timer is currently running on.
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Subscribe to live-status snapshots.
    pub fn subscribe(&self) -> watch::Receiver<LiveStatus> {
        self.status_rx.clone()
    }

    /// Spawn the poll loop onto the given runtime, returning a handle.
    pub fn spawn(self, runtime: &tokio::runtime::Handle) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = PollerHandle {
            status_rx: self.status_rx.clone(),
            errors: Arc::clone(&self.errors),
            shutdown_tx,
        };

        runtime.spawn(self.run(shutdown_rx));
        handle
    }

    /// The poll loop: tick, then sleep on the currently selected interval
    /// until the next tick or shutdown.
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Status poller starting");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.tick().await;
            if let Some(error) = &report.error {
                warn!(kind = ?error.kind, "Poll tick failed: {}", error.message);
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.current_interval) => {}
            }
        }

        info!("Status poller stopped");
    }

    /// Run one poll tick.
    #[instrument(name = "poll_tick", skip(self))]
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let epoch = self.cache.epoch();

        // Resolve the channel identity first if the cache is empty.
        let identity = match self.cache.identity() {
            Some(identity) => identity,
            None => {
                let input = self.cache.input_identifier();
                match resolve(self.api.as_ref(), &input).await {
                    Ok(identity) => {
                        if !self.cache.store_identity(epoch, identity.clone()) {
                            report.discarded = true;
                            return report;
                        }
                        identity
                    }
                    Err(error) => {
                        self.record_error(&error, &mut report);
                        return report;
                    }
                }
            }
        };

        // Prefer the cheap direct re-check of the last known live video;
        // fall back to scanning the single most recent upload.
        let checked = if let Some(video_id) = self.cache.last_live_video_id() {
            match self.api.video_detail(&video_id).await {
                Ok(Some(detail)) => Some((video_id, detail)),
                Ok(None) => {
                    // The previously live video vanished. Clear the entry
                    // and leave this tick inconclusive; the next tick
                    // resolves it through the fallback scan.
                    debug!(video_id, "Cached live video not found, deferring to fallback");
                    self.cache.clear_live_video(epoch);
                    return report;
                }
                Err(error) => {
                    self.record_error(&error, &mut report);
                    return report;
                }
            }
        } else {
            match self.scan_latest_upload(&identity).await {
                Ok(checked) => checked,
                Err(error) => {
                    self.record_error(&error, &mut report);
                    return report;
                }
            }
        };

        // Remember a live video so subsequent ticks use the direct check;
        // otherwise make sure the next tick performs the fallback scan.
        let status = match checked {
            Some((video_id, detail)) if detail.is_live() => {
                if !self.cache.set_live_video(epoch, video_id.clone()) {
                    report.discarded = true;
                    return report;
                }
                LiveStatus {
                    is_live: true,
                    viewer_count: detail.concurrent_viewers,
                    title: detail.title,
                    live_video_id: video_id,
                }
            }
            _ => {
                self.cache.clear_live_video(epoch);
                LiveStatus::default()
            }
        };

        // A snapshot for an identifier that changed mid-tick must not be
        // published.
        if self.cache.epoch() != epoch {
            report.discarded = true;
            return report;
        }

        *self.errors.lock() = None;

        let transitioned = status.is_live != self.last_is_live;
        self.last_is_live = status.is_live;
        report.published = Some(status.clone());
        self.status_tx.send_replace(status);

        // The timer is recreated only on a transition; a repeated
        // observation leaves it untouched.
        if transitioned {
            self.current_interval = self.policy.interval_for(self.last_is_live);
            report.interval_reselected = true;
            debug!(interval = ?self.current_interval, "Poll interval reselected");
        }

        report
    }

    /// Fallback path: fetch the most recent upload, then its detail.
    async fn scan_latest_upload(
        &self,
        identity: &ChannelIdentity,
    ) -> Result<Option<(String, crate::VideoDetail)>, StatusError> {
        let Some(video_id) = self.api.latest_upload(&identity.uploads_collection_id).await?
        else {
            // A channel with no uploads is simply not live.
            return Ok(None);
        };

        let detail = self.api.video_detail(&video_id).await?;
        Ok(detail.map(|detail| (video_id, detail)))
    }

    fn record_error(&self, error: &StatusError, report: &mut TickReport) {
        let poll_error = PollError::from(error);
        *self.errors.lock() = Some(poll_error.clone());
        report.error = Some(poll_error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChannelResource, VideoDetail};
    use crate::StatusResult;

    use async_trait::async_trait;
    use livetally_ipc::StatusErrorKind;

    type DetailFn = Box<dyn Fn(&str) -> StatusResult<Option<VideoDetail>> + Send + Sync>;
    type LatestFn = Box<dyn Fn() -> StatusResult<Option<String>> + Send + Sync>;

    /// A scriptable API that records the order of calls.
    struct ScriptedApi {
        latest: Mutex<LatestFn>,
        detail: Mutex<DetailFn>,
        calls: Mutex<Vec<String>>,
        on_detail: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
    }

    impl ScriptedApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                latest: Mutex::new(Box::new(|| Ok(Some("vid1".to_string())))),
                detail: Mutex::new(Box::new(|_| Ok(Some(live_detail("First tick"))))),
                calls: Mutex::new(Vec::new()),
                on_detail: Mutex::new(None),
            })
        }

        fn set_latest(&self, f: impl Fn() -> StatusResult<Option<String>> + Send + Sync + 'static) {
            *self.latest.lock() = Box::new(f);
        }

        fn set_detail(
            &self,
            f: impl Fn(&str) -> StatusResult<Option<VideoDetail>> + Send + Sync + 'static,
        ) {
            *self.detail.lock() = Box::new(f);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn clear_calls(&self) {
            self.calls.lock().clear();
        }
    }

    #[async_trait]
    impl StatusApi for ScriptedApi {
        async fn channel_by_id(&self, id: &str) -> StatusResult<Option<ChannelResource>> {
            self.calls.lock().push("channel_by_id".to_string());
            Ok(Some(ChannelResource {
                channel_id: Some(id.to_string()),
                uploads_collection_id: Some("UUuploads".to_string()),
            }))
        }

        async fn channel_by_handle(&self, _: &str) -> StatusResult<Option<ChannelResource>> {
            self.calls.lock().push("channel_by_handle".to_string());
            Ok(Some(ChannelResource {
                channel_id: Some("UCchannel".to_string()),
                uploads_collection_id: Some("UUuploads".to_string()),
            }))
        }

        async fn latest_upload(&self, _: &str) -> StatusResult<Option<String>> {
            self.calls.lock().push("latest_upload".to_string());
            (self.latest.lock())()
        }

        async fn video_detail(&self, video_id: &str) -> StatusResult<Option<VideoDetail>> {
            self.calls.lock().push(format!("video_detail:{video_id}"));
            if let Some(hook) = self.on_detail.lock().as_ref() {
                hook();
            }
            (self.detail.lock())(video_id)
        }
    }

    fn live_detail(title: &str) -> VideoDetail {
        VideoDetail {
            title: title.to_string(),
            concurrent_viewers: 42,
            actual_start_time: Some("2026-01-01T00:00:00Z".to_string()),
            actual_end_time: None,
        }
    }

    fn ended_detail() -> VideoDetail {
        VideoDetail {
            title: "Old stream".to_string(),
            concurrent_viewers: 0,
            actual_start_time: Some("2026-01-01T00:00:00Z".to_string()),
            actual_end_time: Some("2026-01-01T01:00:00Z".to_string()),
        }
    }

    fn poller(api: Arc<ScriptedApi>) -> (StatusPoller, CacheHandle) {
        let cache = CacheHandle::new("@channel");
        let policy = PollIntervalPolicy {
            live_interval_secs: 30.0,
            not_live_interval_secs: 120.0,
        };
        (
            StatusPoller::new(api, cache.clone(), policy),
            cache,
        )
    }

    #[tokio::test]
    async fn live_tick_caches_video_for_direct_recheck() {
        let api = ScriptedApi::new();
        let (mut poller, cache) = poller(Arc::clone(&api));

        let report = poller.tick().await;
        let status = report.published.unwrap();
        assert!(status.is_live);
        assert_eq!(status.viewer_count, 42);
        assert_eq!(cache.last_live_video_id().as_deref(), Some("vid1"));

        // Second tick checks the cached video directly, no uploads scan.
        api.clear_calls();
        poller.tick().await;
        assert_eq!(api.calls(), vec!["video_detail:vid1".to_string()]);
    }

    #[tokio::test]
    async fn not_live_recheck_falls_back_to_uploads_scan_next_tick() {
        let api = ScriptedApi::new();
        let (mut poller, cache) = poller(Arc::clone(&api));

        poller.tick().await;
        assert!(cache.last_live_video_id().is_some());

        // The cached video has ended.
        api.set_detail(|_| Ok(Some(ended_detail())));
        api.clear_calls();
        let report = poller.tick().await;
        assert!(!report.published.unwrap().is_live);
        assert!(cache.last_live_video_id().is_none());
        assert_eq!(api.calls(), vec!["video_detail:vid1".to_string()]);

        // Next tick must scan the uploads collection again.
        api.clear_calls();
        poller.tick().await;
        assert_eq!(
            api.calls(),
            vec!["latest_upload".to_string(), "video_detail:vid1".to_string()]
        );
    }

    #[tokio::test]
    async fn vanished_cached_video_is_inconclusive() {
        let api = ScriptedApi::new();
        let (mut poller, cache) = poller(Arc::clone(&api));

        let first = poller.tick().await.published.unwrap();
        assert!(first.is_live);

        // The cached video no longer exists at all.
        api.set_detail(|_| Ok(None));
        let report = poller.tick().await;
        assert!(report.published.is_none());
        assert!(report.error.is_none());
        assert!(cache.last_live_video_id().is_none());

        // The previous snapshot is still what subscribers see.
        assert!(poller.subscribe().borrow().is_live);
    }

    #[tokio::test]
    async fn interval_reselected_exactly_at_transitions() {
        let api = ScriptedApi::new();
        let (mut poller, _cache) = poller(Arc::clone(&api));

        // Tick 1: not live (no transition from the initial not-live).
        api.set_detail(|_| Ok(Some(ended_detail())));
        let report = poller.tick().await;
        assert!(!report.interval_reselected);
        assert_eq!(poller.current_interval(), Duration::from_secs(120));

        // Tick 2: goes live -> reselect.
        api.set_detail(|_| Ok(Some(live_detail("Live now"))));
        let report = poller.tick().await;
        assert!(report.interval_reselected);
        assert_eq!(poller.current_interval(), Duration::from_secs(30));

        // Tick 3: still live -> untouched.
        let report = poller.tick().await;
        assert!(!report.interval_reselected);
        assert_eq!(poller.current_interval(), Duration::from_secs(30));

        // Tick 4: goes offline -> reselect.
        api.set_detail(|_| Ok(Some(ended_detail())));
        let report = poller.tick().await;
        assert!(report.interval_reselected);
        assert_eq!(poller.current_interval(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn quota_error_preserves_previous_status_and_keeps_ticking() {
        let api = ScriptedApi::new();
        let (mut poller, _cache) = poller(Arc::clone(&api));

        let first = poller.tick().await.published.unwrap();
        assert!(first.is_live);

        api.set_detail(|_| Err(StatusError::QuotaExceeded("403".to_string())));
        let report = poller.tick().await;
        assert_eq!(
            report.error.as_ref().map(|e| e.kind),
            Some(StatusErrorKind::QuotaExceeded)
        );
        assert!(report.published.is_none());
        assert!(!report.interval_reselected);

        // Previous snapshot untouched.
        assert_eq!(*poller.subscribe().borrow(), first);

        // The condition clears and the next tick publishes again.
        api.set_detail(|_| Ok(Some(live_detail("Back"))));
        let report = poller.tick().await;
        assert_eq!(report.published.unwrap().title, "Back");
    }

    #[tokio::test]
    async fn identifier_change_during_tick_discards_result() {
        let api = ScriptedApi::new();
        let (mut poller, cache) = poller(Arc::clone(&api));

        // Flip the identifier while the video-detail call is in flight.
        let flipped = cache.clone();
        *api.on_detail.lock() = Some(Box::new(move || {
            flipped.set_identifier("@different");
        }));

        let report = poller.tick().await;
        assert!(report.discarded);
        assert!(report.published.is_none());

        // Nothing from the stale tick repopulated the cache.
        assert!(cache.identity().is_none());
        assert!(cache.last_live_video_id().is_none());
        assert!(!poller.subscribe().borrow().is_live);
    }
}
