//! Resource management and initialization tracking.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use livetally_ipc::{LiveStatus, MonitorConfig, StartupPhase};
use livetally_output::{
    create_backend, BroadcastBackend, BroadcastSender, OutputResult, VideoMode,
};
use livetally_status::{CacheHandle, PollerHandle, StatusApi, StatusPoller, YouTubeClient};

use crate::error::EngineError;

/// Builds the status API client for a monitor session.
pub type ApiFactory = Box<dyn Fn(&MonitorConfig) -> Arc<dyn StatusApi> + Send + Sync>;

/// Builds the broadcast SDK backend for a monitor session.
pub type BackendFactory = Box<dyn Fn() -> OutputResult<Box<dyn BroadcastBackend>> + Send + Sync>;

/// The real remote API client, keyed per session.
pub fn default_api_factory() -> ApiFactory {
    Box::new(|config| Arc::new(YouTubeClient::new(config.api_key.clone())))
}

/// The compiled-in broadcast SDK backend.
pub fn default_backend_factory() -> BackendFactory {
    Box::new(create_backend)
}

/// Resources that have been initialized during startup.
#[derive(Default)]
pub struct InitializedResources {
    /// Handle to the running status poller.
    pub poller: Option<PollerHandle>,

    /// Receiver for live-status snapshots.
    pub status_rx: Option<watch::Receiver<LiveStatus>>,

    /// Broadcast sender, shared with the frame loop.
    pub sender: Option<Arc<Mutex<BroadcastSender>>>,
}

impl InitializedResources {
    /// Create empty resources.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Manages resource initialization and cleanup.
///
/// Startup walks the phases in order; a failure rolls back everything
/// initialized so far in reverse, so a failed start never leaks a running
/// poller or a half-open broadcast session.
pub struct ResourceManager {
    resources: Mutex<InitializedResources>,
    current_phase: Mutex<Option<StartupPhase>>,
    cache: CacheHandle,
    runtime: Runtime,
    api_factory: ApiFactory,
    backend_factory: BackendFactory,
}

impl ResourceManager {
    /// Create a new resource manager with its own poller runtime.
    pub fn new(
        cache: CacheHandle,
        api_factory: ApiFactory,
        backend_factory: BackendFactory,
    ) -> Result<Self, EngineError> {
        let runtime = Runtime::new()?;

        Ok(Self {
            resources: Mutex::new(InitializedResources::new()),
            current_phase: Mutex::new(None),
            cache,
            runtime,
            api_factory,
            backend_factory,
        })
    }

    /// Initialize resources up to and including the specified phase.
    #[instrument(name = "init_resources", skip(self, config))]
    pub fn initialize(
        &self,
        config: &MonitorConfig,
        target_phase: StartupPhase,
    ) -> Result<(), String> {
        let mut phase = StartupPhase::StartPoller;

        loop {
            *self.current_phase.lock() = Some(phase);
            self.init_phase(config, phase)?;

            if phase == target_phase {
                break;
            }

            phase = phase.next().ok_or("No more phases")?;
        }

        Ok(())
    }

    /// Initialize a single phase.
    fn init_phase(&self, config: &MonitorConfig, phase: StartupPhase) -> Result<(), String> {
        info!("Initializing phase: {:?}", phase);

        match phase {
            StartupPhase::StartPoller => self.start_poller(config),
            StartupPhase::CreateSender => self.create_sender(config),
            StartupPhase::StartFrameLoop => self.frame_loop_ready(),
        }
    }

    fn start_poller(&self, config: &MonitorConfig) -> Result<(), String> {
        self.cache.set_identifier(config.channel.clone());

        let api = (self.api_factory)(config);
        let poller = StatusPoller::new(api, self.cache.clone(), config.intervals);
        let status_rx = poller.subscribe();
        let handle = poller.spawn(self.runtime.handle());

        let mut resources = self.resources.lock();
        resources.poller = Some(handle);
        resources.status_rx = Some(status_rx);

        debug!("Status poller started");
        Ok(())
    }

    fn create_sender(&self, config: &MonitorConfig) -> Result<(), String> {
        let backend = (self.backend_factory)()
            .map_err(|e| format!("Broadcast backend init failed: {}", e))?;

        let mut sender = BroadcastSender::new(backend, VideoMode::default());
        sender
            .start(&config.session_name)
            .map_err(|e| format!("Broadcast start failed: {}", e))?;

        self.resources.lock().sender = Some(Arc::new(Mutex::new(sender)));

        debug!("Broadcast sender started");
        Ok(())
    }

    fn frame_loop_ready(&self) -> Result<(), String> {
        // The frame loop thread is spawned by the orchestrator.
        debug!("Frame timer ready");
        Ok(())
    }

    /// Rollback resources from the current phase backwards.
    #[instrument(name = "rollback_resources", skip(self))]
    pub fn rollback(&self) {
        let current = *self.current_phase.lock();

        if let Some(mut phase) = current {
            loop {
                info!("Rolling back phase: {:?}", phase);
                self.rollback_phase(phase);

                match phase.previous() {
                    Some(prev) => phase = prev,
                    None => break,
                }
            }
        }

        *self.current_phase.lock() = None;
    }

    fn rollback_phase(&self, phase: StartupPhase) {
        let mut resources = self.resources.lock();

        match phase {
            StartupPhase::StartFrameLoop => {
                // The orchestrator joins its frame thread before rollback.
            }
            StartupPhase::CreateSender => {
                if let Some(sender) = resources.sender.take() {
                    sender.lock().stop();
                }
            }
            StartupPhase::StartPoller => {
                if let Some(poller) = resources.poller.take() {
                    poller.stop();
                }
                resources.status_rx = None;
            }
        }
    }

    /// Shutdown all resources cleanly.
    #[instrument(name = "shutdown_resources", skip(self))]
    pub fn shutdown(&self) {
        info!("Shutting down all resources");
        self.rollback();
    }

    /// Get a reference to the resources (for the orchestrator).
    pub fn resources(&self) -> &Mutex<InitializedResources> {
        &self.resources
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use livetally_output::{FrameBuffer, OutputError};
    use livetally_status::{ChannelResource, StatusResult, VideoDetail};

    struct NoopApi;

    #[async_trait]
    impl StatusApi for NoopApi {
        async fn channel_by_id(&self, _: &str) -> StatusResult<Option<ChannelResource>> {
            Ok(None)
        }

        async fn channel_by_handle(&self, _: &str) -> StatusResult<Option<ChannelResource>> {
            Ok(None)
        }

        async fn latest_upload(&self, _: &str) -> StatusResult<Option<String>> {
            Ok(None)
        }

        async fn video_detail(&self, _: &str) -> StatusResult<Option<VideoDetail>> {
            Ok(None)
        }
    }

    struct NullBackend;

    impl BroadcastBackend for NullBackend {
        fn connect(&mut self, _: &str) -> OutputResult<()> {
            Ok(())
        }

        fn send_video(&mut self, _: &FrameBuffer, _: &VideoMode) -> OutputResult<()> {
            Ok(())
        }

        fn send_metadata(&mut self, _: &str) -> OutputResult<()> {
            Ok(())
        }

        fn disconnect(&mut self) {}

        fn name(&self) -> &'static str {
            "null"
        }
    }

    fn noop_api_factory() -> ApiFactory {
        Box::new(|_| Arc::new(NoopApi))
    }

    #[test]
    fn initialize_all_phases_populates_resources() {
        let manager = ResourceManager::new(
            CacheHandle::new(""),
            noop_api_factory(),
            Box::new(|| Ok(Box::new(NullBackend))),
        )
        .unwrap();

        let config = MonitorConfig {
            channel: "@channel".to_string(),
            ..MonitorConfig::default()
        };
        manager
            .initialize(&config, StartupPhase::StartFrameLoop)
            .unwrap();

        {
            let resources = manager.resources().lock();
            assert!(resources.poller.is_some());
            assert!(resources.status_rx.is_some());
            assert!(resources.sender.is_some());
        }

        manager.shutdown();
        let resources = manager.resources().lock();
        assert!(resources.poller.is_none());
        assert!(resources.status_rx.is_none());
        assert!(resources.sender.is_none());
    }

    #[test]
    fn failed_sender_phase_rolls_back_poller() {
        let manager = ResourceManager::new(
            CacheHandle::new(""),
            noop_api_factory(),
            Box::new(|| Err(OutputError::NotSupported("test".to_string()))),
        )
        .unwrap();

        let config = MonitorConfig {
            channel: "@channel".to_string(),
            ..MonitorConfig::default()
        };
        let err = manager
            .initialize(&config, StartupPhase::StartFrameLoop)
            .unwrap_err();
        assert!(err.contains("Broadcast backend init failed"));

        manager.rollback();

        let resources = manager.resources().lock();
        assert!(resources.poller.is_none());
        assert!(resources.status_rx.is_none());
        assert!(resources.sender.is_none());
    }
}
