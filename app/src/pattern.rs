//! Built-in test pattern frame source.

use bytes::Bytes;
use livetally_engine::{FrameSource, SourceFrame};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Seven vertical bars, BGRA.
const BARS: [[u8; 4]; 7] = [
    [0xC0, 0xC0, 0xC0, 0xFF], // white
    [0x00, 0xC0, 0xC0, 0xFF], // yellow
    [0xC0, 0xC0, 0x00, 0xFF], // cyan
    [0x00, 0xC0, 0x00, 0xFF], // green
    [0xC0, 0x00, 0xC0, 0xFF], // magenta
    [0x00, 0x00, 0xC0, 0xFF], // red
    [0xC0, 0x00, 0x00, 0xFF], // blue
];

/// Static color-bar source for running without a real rendering surface.
pub struct ColorBars {
    frame: Bytes,
}

impl ColorBars {
    pub fn new() -> Self {
        let mut data = vec![0u8; WIDTH as usize * HEIGHT as usize * 4];

        for x in 0..WIDTH as usize {
            let color = BARS[x * BARS.len() / WIDTH as usize];
            for y in 0..HEIGHT as usize {
                let offset = (y * WIDTH as usize + x) * 4;
                data[offset..offset + 4].copy_from_slice(&color);
            }
        }

        Self {
            frame: Bytes::from(data),
        }
    }
}

impl Default for ColorBars {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ColorBars {
    fn next_frame(&mut self) -> Option<SourceFrame> {
        Some(SourceFrame {
            data: self.frame.clone(),
            width: WIDTH,
            height: HEIGHT,
        })
    }
}
