//! Main engine orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use livetally_ipc::{
    EngineCommand, EngineEvent, EngineState, LiveStatus, MonitorConfig, ShutdownPhase,
    StartupPhase, StopReason,
};
use livetally_output::{composite_into, encode_tally, fit, BroadcastSender, Size};
use livetally_status::CacheHandle;

use crate::error::EngineError;
use crate::source::FrameSource;
use crate::state::{
    default_api_factory, default_backend_factory, ApiFactory, BackendFactory, ResourceManager,
};

/// The main monitoring engine.
pub struct Engine {
    command_rx: Receiver<EngineCommand>,
    event_tx: Sender<EngineEvent>,
    state: Arc<RwLock<EngineState>>,
    resource_manager: Arc<ResourceManager>,
    cache: CacheHandle,
    frame_source: Option<Box<dyn FrameSource>>,
    frame_thread: Option<JoinHandle<Box<dyn FrameSource>>>,
    status_rx: Option<watch::Receiver<LiveStatus>>,
    should_stop: Arc<AtomicBool>,
}

impl Engine {
    /// Create a new engine over the real API client and the compiled-in
    /// broadcast backend.
    pub fn new(
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
        frame_source: Box<dyn FrameSource>,
    ) -> Result<Self, EngineError> {
        Self::with_factories(
            command_rx,
            event_tx,
            frame_source,
            default_api_factory(),
            default_backend_factory(),
        )
    }

    /// Create an engine with explicit API and backend factories.
    pub fn with_factories(
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
        frame_source: Box<dyn FrameSource>,
        api_factory: ApiFactory,
        backend_factory: BackendFactory,
    ) -> Result<Self, EngineError> {
        let cache = CacheHandle::new("");
        let resource_manager =
            ResourceManager::new(cache.clone(), api_factory, backend_factory)?;

        Ok(Self {
            command_rx,
            event_tx,
            state: Arc::new(RwLock::new(EngineState::Idle)),
            resource_manager: Arc::new(resource_manager),
            cache,
            frame_source: Some(frame_source),
            frame_thread: None,
            status_rx: None,
            should_stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Run the engine (blocking).
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("Engine starting");
        self.send_event(EngineEvent::Ready);

        loop {
            match self.command_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    // Forward any fresh status snapshot and poll failures
                    if self.state.read().is_live() {
                        self.pump_status();
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    break;
                }
            }
        }

        info!("Engine stopped");
    }

    /// Handle a command. Returns false if engine should stop.
    fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            EngineCommand::Start { config } => self.start_monitor(config),
            EngineCommand::Stop => self.stop_monitor(StopReason::UserRequested),
            EngineCommand::SetChannel(identifier) => self.set_channel(identifier),
            EngineCommand::GetState => self.send_state(),
            EngineCommand::Shutdown => {
                self.stop_monitor(StopReason::UserRequested);
                self.send_event(EngineEvent::Shutdown);
                return false;
            }
        }

        true
    }

    /// Start monitoring.
    #[instrument(name = "start_monitor", skip(self, config))]
    fn start_monitor(&mut self, config: MonitorConfig) {
        // Idempotent: ignore if already starting or live
        {
            let state = self.state.read();
            if state.is_starting() || state.is_live() {
                debug!("Already starting or live, ignoring start command");
                return;
            }
        }

        info!(channel = %config.channel, "Starting monitor");
        self.transition_to(EngineState::Starting {
            phase: StartupPhase::StartPoller,
        });

        match self
            .resource_manager
            .initialize(&config, StartupPhase::StartFrameLoop)
        {
            Ok(()) => {
                self.status_rx = self.resource_manager.resources().lock().status_rx.clone();

                self.transition_to(EngineState::Live { config });
                self.start_frame_loop();

                info!("Monitor started successfully");
            }
            Err(e) => {
                error!("Monitor start failed: {}", e);

                // Rollback any initialized resources
                self.resource_manager.rollback();

                self.transition_to(EngineState::Error {
                    message: e,
                    recoverable: true,
                });
            }
        }
    }

    /// Start the frame timer loop in a separate thread.
    fn start_frame_loop(&mut self) {
        let Some(source) = self.frame_source.take() else {
            warn!("No frame source available, video output disabled");
            return;
        };

        let sender = self
            .resource_manager
            .resources()
            .lock()
            .sender
            .clone()
            .expect("broadcast sender should be initialized");

        let should_stop = Arc::clone(&self.should_stop);
        should_stop.store(false, Ordering::SeqCst);

        let handle = thread::spawn(move || frame_loop(sender, source, should_stop));
        self.frame_thread = Some(handle);
    }

    /// Stop monitoring.
    #[instrument(name = "stop_monitor", skip(self))]
    fn stop_monitor(&mut self, reason: StopReason) {
        // Idempotent: ignore if already idle or stopping
        {
            let state = self.state.read();
            if state.is_idle() || state.is_stopping() {
                debug!("Already idle or stopping, ignoring stop command");
                return;
            }
        }

        info!(?reason, "Stopping monitor");

        self.transition_to(EngineState::Stopping {
            reason: reason.clone(),
            phase: ShutdownPhase::StopFrameLoop,
        });

        // Signal the frame loop to stop and recover the frame source for
        // the next session
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.frame_thread.take() {
            if let Ok(source) = handle.join() {
                self.frame_source = Some(source);
            }
        }

        self.status_rx = None;
        self.resource_manager.shutdown();

        self.transition_to(EngineState::Idle);
        info!("Monitor stopped");
    }

    fn set_channel(&self, identifier: String) {
        info!(%identifier, "Switching monitored channel");
        self.cache.set_identifier(identifier);
    }

    fn send_state(&self) {
        let state = self.state.read().clone();
        self.send_event(EngineEvent::StateChanged {
            previous: Box::new(state.clone()),
            current: Box::new(state),
        });
    }

    /// Forward a fresh status snapshot to the side channel and the shell,
    /// plus any poll failure recorded since the last pump.
    fn pump_status(&mut self) {
        let poll_error = {
            let resources = self.resource_manager.resources().lock();
            resources.poller.as_ref().and_then(|p| p.take_error())
        };
        if let Some(error) = poll_error {
            self.send_event(EngineEvent::StatusError {
                kind: error.kind,
                message: error.message,
            });
        }

        let Some(status_rx) = self.status_rx.as_mut() else {
            return;
        };
        if !status_rx.has_changed().unwrap_or(false) {
            return;
        }
        let status = status_rx.borrow_and_update().clone();

        let record = encode_tally(status.is_live, status.viewer_count, &status.title);
        if let Some(sender) = self.resource_manager.resources().lock().sender.as_ref() {
            sender.lock().send_metadata(&record);
        }

        info!(
            is_live = status.is_live,
            viewers = status.viewer_count,
            "Live status updated"
        );
        self.send_event(EngineEvent::Status(status));
    }

    fn transition_to(&self, new_state: EngineState) {
        let previous = {
            let mut state = self.state.write();
            let prev = state.clone();
            *state = new_state.clone();
            prev
        };

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(EngineEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: EngineEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.frame_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Frame timer loop: composite and transmit one output frame per tick.
///
/// Returns the frame source so a later session can reuse it.
fn frame_loop(
    sender: Arc<Mutex<BroadcastSender>>,
    mut source: Box<dyn FrameSource>,
    should_stop: Arc<AtomicBool>,
) -> Box<dyn FrameSource> {
    debug!("Frame loop starting");

    let mode = sender.lock().mode();
    let frame_interval = Duration::from_nanos(
        1_000_000_000u64 * mode.frame_rate_d as u64 / mode.frame_rate_n as u64,
    );

    let start_time = Instant::now();
    let mut frames_sent: u64 = 0;
    let mut frames_skipped: u64 = 0;
    let mut last_log_time = Instant::now();

    while !should_stop.load(Ordering::SeqCst) {
        let frame_start = Instant::now();

        // Periodic status logging every 5 seconds
        if last_log_time.elapsed() >= Duration::from_secs(5) {
            info!(
                "Frame loop stats: sent={}, skipped={}, uptime={:.1}s",
                frames_sent,
                frames_skipped,
                start_time.elapsed().as_secs_f32()
            );
            last_log_time = Instant::now();
        }

        match source.next_frame() {
            Some(frame) => {
                let mut sender = sender.lock();
                if let Some(buffer) = sender.frame_mut() {
                    buffer.clear();
                    let rect = fit(
                        Size::new(frame.width, frame.height),
                        Size::new(mode.width, mode.height),
                    );
                    composite_into(&frame.data, frame.width, frame.height, buffer, rect);
                }
                sender.send_frame();
                frames_sent += 1;
            }
            None => {
                frames_skipped += 1;
            }
        }

        // Rate limiting to the output frame rate
        let elapsed = frame_start.elapsed();
        if elapsed < frame_interval {
            thread::sleep(frame_interval - elapsed);
        }
    }

    info!(
        "Frame loop stopped: total sent={}, skipped={}",
        frames_sent, frames_skipped
    );

    source
}
