//! The broadcast sender and its SDK backend seam.

use tracing::{debug, info, instrument, warn};

use crate::buffer::{BufferPool, FrameBuffer};
use crate::error::OutputError;
use crate::{OutputResult, VideoMode};

/// Trait for broadcast SDK backends.
///
/// The sender drives exactly one backend; the real SDK lives on the far
/// side of this seam so the lifecycle logic is testable without it.
pub trait BroadcastBackend: Send {
    /// Create the connection handle, announcing the session under the
    /// given name.
    fn connect(&mut self, session_name: &str) -> OutputResult<()>;

    /// Transmit one video frame.
    fn send_video(&mut self, frame: &FrameBuffer, mode: &VideoMode) -> OutputResult<()>;

    /// Transmit a side-channel metadata record.
    fn send_metadata(&mut self, record: &str) -> OutputResult<()>;

    /// Release the connection handle. Must be safe to call repeatedly.
    fn disconnect(&mut self);

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Create the broadcast backend.
#[cfg(feature = "ndi-sdk")]
pub fn create_backend() -> OutputResult<Box<dyn BroadcastBackend>> {
    let backend = crate::ndi::NdiBackend::new()?;
    info!("Using NDI broadcast backend");
    Ok(Box::new(backend))
}

/// Create the broadcast backend (stub when no SDK backend is compiled in).
#[cfg(not(feature = "ndi-sdk"))]
pub fn create_backend() -> OutputResult<Box<dyn BroadcastBackend>> {
    Err(OutputError::NotSupported(
        "built without the ndi-sdk feature".into(),
    ))
}

/// Sole owner of the connection to the broadcast SDK.
///
/// Owns the frame buffer pool for the session; `start`/`stop` bound the
/// buffer's lifetime, and every exit path of a failed `start` releases
/// what was acquired.
pub struct BroadcastSender {
    backend: Box<dyn BroadcastBackend>,
    pool: BufferPool,
    mode: VideoMode,
    session_name: Option<String>,
}

impl BroadcastSender {
    /// Create a sender over the given backend.
    pub fn new(backend: Box<dyn BroadcastBackend>, mode: VideoMode) -> Self {
        Self {
            backend,
            pool: BufferPool::new(),
            mode,
            session_name: None,
        }
    }

    /// Whether the sender has an active session.
    pub fn is_started(&self) -> bool {
        self.session_name.is_some()
    }

    /// The output video mode.
    pub fn mode(&self) -> VideoMode {
        self.mode
    }

    /// Start a broadcast session: allocate the frame buffer and create
    /// the connection handle.
    ///
    /// On connection failure the buffer is released again; no
    /// half-initialized state is retained.
    #[instrument(name = "sender_start", skip(self))]
    pub fn start(&mut self, session_name: &str) -> OutputResult<()> {
        if self.session_name.is_some() {
            return Err(OutputError::AlreadyStarted);
        }

        info!(session_name, backend = self.backend.name(), "Starting broadcast");
        self.pool.acquire(self.mode);

        if let Err(e) = self.backend.connect(session_name) {
            self.pool.release();
            return Err(e);
        }

        self.session_name = Some(session_name.to_string());
        Ok(())
    }

    /// The session frame buffer, for compositing. `None` before `start`
    /// and after `stop`.
    pub fn frame_mut(&mut self) -> Option<&mut FrameBuffer> {
        if self.session_name.is_none() {
            return None;
        }
        self.pool.current()
    }

    /// Transmit the composited session buffer as one video frame.
    ///
    /// A logged no-op before `start` or after `stop`; send failures are
    /// swallowed with a diagnostic, since one dropped frame is not fatal.
    pub fn send_frame(&mut self) {
        if self.session_name.is_none() {
            debug!("send_frame called without an active session, ignoring");
            return;
        }

        let Some(buffer) = self.pool.current() else {
            debug!("send_frame called without an allocated buffer, ignoring");
            return;
        };

        if let Err(e) = self.backend.send_video(buffer, &self.mode) {
            warn!("Failed to send video frame: {}", e);
        }
    }

    /// Transmit a tally metadata record, independent of the video path.
    ///
    /// Safe to call before any video frame has been sent; a logged no-op
    /// without an active session.
    pub fn send_metadata(&mut self, record: &str) {
        if self.session_name.is_none() {
            debug!("send_metadata called without an active session, ignoring");
            return;
        }

        if let Err(e) = self.backend.send_metadata(record) {
            warn!("Failed to send metadata: {}", e);
        }
    }

    /// Stop the session, releasing the connection handle and the frame
    /// buffer. Idempotent; safe before `start`.
    #[instrument(name = "sender_stop", skip(self))]
    pub fn stop(&mut self) {
        if self.session_name.take().is_some() {
            info!("Stopping broadcast");
            self.backend.disconnect();
        }
        self.pool.release();
    }
}

impl Drop for BroadcastSender {
    fn drop(&mut self) {
        self.stop();
    }
}
