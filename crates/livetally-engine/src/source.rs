//! The frame source seam.

use bytes::Bytes;

/// One BGRA frame handed to the compositor.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Tightly packed BGRA pixel data.
    pub data: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,
}

impl SourceFrame {
    /// Whether the pixel data matches the declared dimensions.
    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.width as usize * self.height as usize * 4
    }
}

/// Supplies frames for the output video signal.
///
/// The frame loop pulls one frame per output tick. A source with nothing
/// to show may return `None`; the tick is skipped and the pacing is
/// unaffected.
pub trait FrameSource: Send {
    /// Produce the next frame, if one is available.
    fn next_frame(&mut self) -> Option<SourceFrame>;
}
