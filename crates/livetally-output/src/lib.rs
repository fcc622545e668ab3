//! Broadcast output: tally metadata and the video frame pipeline.
//!
//! This crate turns the monitor's state into a wire-compatible video
//! signal with bounded, reused memory, plus a small side-channel protocol
//! for out-of-band tally data. The vendor SDK sits behind the
//! [`BroadcastBackend`] trait; everything above it is plain Rust.

mod backend;
mod buffer;
mod compositor;
mod error;
mod metadata;
#[cfg(feature = "ndi-sdk")]
mod ndi;

pub use backend::{create_backend, BroadcastBackend, BroadcastSender};
pub use buffer::{BufferPool, FrameBuffer};
pub use compositor::{composite_into, fit, Rect, Size};
pub use error::OutputError;
pub use metadata::{encode_tally, escape_attribute};
#[cfg(feature = "ndi-sdk")]
pub use ndi::NdiBackend;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Bytes per output pixel (one 32-bit BGRA pixel).
pub const BYTES_PER_PIXEL: usize = 4;

/// The fixed output video mode: resolution, pixel stride, and the declared
/// rational frame rate. The aspect ratio follows from the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Frame rate numerator.
    pub frame_rate_n: u32,

    /// Frame rate denominator.
    pub frame_rate_d: u32,
}

impl VideoMode {
    /// Frame buffer size in bytes for this mode.
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

impl Default for VideoMode {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate_n: 30,
            frame_rate_d: 1,
        }
    }
}
