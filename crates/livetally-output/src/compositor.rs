//! Aspect-preserving frame placement and compositing.

use crate::{FrameBuffer, BYTES_PER_PIXEL};

/// A pixel dimension pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A placement rectangle inside the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compute the largest centered rectangle with `source`'s aspect ratio
/// that fits inside `target`.
///
/// The equal-aspect comparison is done by integer cross-multiplication, so
/// the degenerate case returns the target rectangle exactly rather than to
/// within floating-point tolerance.
pub fn fit(source: Size, target: Size) -> Rect {
    if source.width == 0 || source.height == 0 {
        return Rect {
            x: 0,
            y: 0,
            width: target.width,
            height: target.height,
        };
    }

    let source_cross = source.width as u64 * target.height as u64;
    let target_cross = target.width as u64 * source.height as u64;

    if source_cross == target_cross {
        return Rect {
            x: 0,
            y: 0,
            width: target.width,
            height: target.height,
        };
    }

    if source_cross > target_cross {
        // Source is relatively wider: bind to target width, letterbox
        // top and bottom.
        let height = ((target_cross * target.height as u64 / source_cross) as u32).max(1);
        Rect {
            x: 0,
            y: (target.height - height) / 2,
            width: target.width,
            height,
        }
    } else {
        // Source is relatively taller: bind to target height, pillarbox
        // left and right.
        let width = ((source_cross * target.width as u64 / target_cross) as u32).max(1);
        Rect {
            x: (target.width - width) / 2,
            y: 0,
            width,
            height: target.height,
        }
    }
}

/// Draw `source` BGRA pixels into `rect` of the destination buffer,
/// scaling by nearest neighbour. Pixels outside the rectangle are left
/// untouched; the caller clears the buffer before compositing.
pub fn composite_into(
    source: &[u8],
    source_width: u32,
    source_height: u32,
    dest: &mut FrameBuffer,
    rect: Rect,
) {
    if rect.width == 0 || rect.height == 0 || source_width == 0 || source_height == 0 {
        return;
    }

    let expected = source_width as usize * source_height as usize * BYTES_PER_PIXEL;
    if source.len() < expected {
        return;
    }

    let dest_stride = dest.stride();
    let src_stride = source_width as usize * BYTES_PER_PIXEL;
    let data = dest.data_mut();

    for row in 0..rect.height as usize {
        let src_y = row * source_height as usize / rect.height as usize;
        let dest_row = (rect.y as usize + row) * dest_stride;
        let src_row = src_y * src_stride;

        for col in 0..rect.width as usize {
            let src_x = col * source_width as usize / rect.width as usize;
            let dest_offset = dest_row + (rect.x as usize + col) * BYTES_PER_PIXEL;
            let src_offset = src_row + src_x * BYTES_PER_PIXEL;

            data[dest_offset..dest_offset + BYTES_PER_PIXEL]
                .copy_from_slice(&source[src_offset..src_offset + BYTES_PER_PIXEL]);
        }
    }
}
