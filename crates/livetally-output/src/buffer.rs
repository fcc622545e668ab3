//! Reusable frame buffer management.

use tracing::debug;

use crate::{VideoMode, BYTES_PER_PIXEL};

/// A fixed-size BGRA pixel buffer for one output frame.
///
/// Allocated once per broadcast session and reused for every frame;
/// cleared (not reallocated) before each composite so letterboxed padding
/// never shows residue from a previous, differently shaped source.
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Allocate a buffer for the given video mode.
    pub fn new(mode: VideoMode) -> Self {
        Self {
            data: vec![0u8; mode.buffer_len()],
            width: mode.width,
            height: mode.height,
        }
    }

    /// Zero the entire buffer.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Owns the single reusable frame buffer for a broadcast session.
///
/// `acquire` allocates on first use; the buffer then lives until
/// `release`. The sender's mutex serializes access, so the buffer is never
/// handed to two concurrent composite operations.
#[derive(Debug, Default)]
pub struct BufferPool {
    buffer: Option<FrameBuffer>,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session buffer, allocating it on first call.
    pub fn acquire(&mut self, mode: VideoMode) -> &mut FrameBuffer {
        self.buffer.get_or_insert_with(|| {
            debug!(
                width = mode.width,
                height = mode.height,
                bytes = mode.buffer_len(),
                "Allocating frame buffer"
            );
            FrameBuffer::new(mode)
        })
    }

    /// The session buffer, if allocated.
    pub fn current(&mut self) -> Option<&mut FrameBuffer> {
        self.buffer.as_mut()
    }

    /// Whether a buffer is currently allocated.
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Deallocate the session buffer. Idempotent.
    pub fn release(&mut self) {
        if self.buffer.take().is_some() {
            debug!("Released frame buffer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_allocates_once_and_reuses() {
        let mut pool = BufferPool::new();
        let mode = VideoMode::default();

        let ptr = pool.acquire(mode).data().as_ptr();
        let len = pool.acquire(mode).data().len();

        assert_eq!(len, 1920 * 1080 * BYTES_PER_PIXEL);
        assert_eq!(pool.acquire(mode).data().as_ptr(), ptr);
    }

    #[test]
    fn clear_zeroes_previous_content() {
        let mut pool = BufferPool::new();
        let buffer = pool.acquire(VideoMode::default());

        buffer.data_mut()[0] = 0xAB;
        buffer.clear();

        assert!(buffer.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn release_is_idempotent() {
        let mut pool = BufferPool::new();
        pool.acquire(VideoMode::default());
        assert!(pool.is_allocated());

        pool.release();
        pool.release();
        assert!(!pool.is_allocated());
        assert!(pool.current().is_none());
    }
}
