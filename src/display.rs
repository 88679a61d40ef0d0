use std::time::Duration;

use anyhow::{anyhow, Result};
use minifb::{Key, Scale, Window, WindowOptions};

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

// palette carried over from the machine this started on
const PIXEL_ON: u32 = 0x0083_A598;
const PIXEL_OFF: u32 = 0x0028_2828;

/// The 64x32 monochrome grid. Only the clear-screen and draw instructions
/// mutate it; the dirty flag tells the presenter a redraw is needed.
pub struct FrameBuffer {
    pixels: [u8; WIDTH * HEIGHT],
    dirty: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [0; WIDTH * HEIGHT],
            dirty: false,
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [0; WIDTH * HEIGHT];
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Hand the dirty flag to the presenter, clearing it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// XOR one 8-bit sprite row onto the grid, MSB leftmost. Pixels past the
    /// right edge are clipped, not wrapped. Returns true if any lit pixel
    /// was erased (the collision condition).
    pub fn xor_row(&mut self, x: usize, y: usize, bits: u8) -> bool {
        let mut erased = false;
        for col in 0..8 {
            if bits & (0x80 >> col) == 0 {
                continue;
            }
            let px = x + col;
            if px >= WIDTH {
                break;
            }
            let cell = &mut self.pixels[y * WIDTH + px];
            *cell ^= 1;
            if *cell == 0 {
                erased = true;
            }
        }
        erased
    }
}

/// Presentation adapter: a minifb window scaled 16x, updated at ~60 fps.
pub struct Screen {
    window: Window,
    frame: Vec<u32>,
}

impl Screen {
    pub fn open() -> Result<Self> {
        let mut window = Window::new(
            "emu8 - ESC to exit",
            WIDTH,
            HEIGHT,
            WindowOptions {
                scale: Scale::X16,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("opening window: {e}"))?;
        window.limit_update_rate(Some(Duration::from_micros(16_600)));
        Ok(Self {
            window,
            frame: vec![PIXEL_OFF; WIDTH * HEIGHT],
        })
    }

    /// False once the user has asked to quit (window closed or Escape).
    pub fn is_running(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn present(&mut self, fb: &FrameBuffer) -> Result<()> {
        for (out, &bit) in self.frame.iter_mut().zip(fb.pixels()) {
            *out = if bit != 0 { PIXEL_ON } else { PIXEL_OFF };
        }
        self.window
            .update_with_buffer(&self.frame, WIDTH, HEIGHT)
            .map_err(|e| anyhow!("presenting frame: {e}"))
    }

    /// Pump window events on frames where nothing changed.
    pub fn pump(&mut self) {
        self.window.update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(fb: &FrameBuffer, x: usize, y: usize) -> u8 {
        fb.pixels()[y * WIDTH + x]
    }

    #[test]
    fn clear_zeroes_every_pixel_and_marks_dirty() {
        let mut fb = FrameBuffer::new();
        fb.xor_row(0, 0, 0xFF);
        fb.mark_dirty();
        fb.take_dirty();

        fb.clear();
        assert!(fb.take_dirty());
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn xor_row_sets_and_erases() {
        let mut fb = FrameBuffer::new();
        assert!(!fb.xor_row(4, 2, 0b1010_0000));
        assert_eq!(px(&fb, 4, 2), 1);
        assert_eq!(px(&fb, 5, 2), 0);
        assert_eq!(px(&fb, 6, 2), 1);

        // same row again: every lit pixel toggles off, which is a collision
        assert!(fb.xor_row(4, 2, 0b1010_0000));
        assert_eq!(px(&fb, 4, 2), 0);
        assert_eq!(px(&fb, 6, 2), 0);
    }

    #[test]
    fn double_xor_restores_prior_contents() {
        let mut fb = FrameBuffer::new();
        fb.xor_row(10, 5, 0b1100_1100);
        let before: Vec<u8> = fb.pixels().to_vec();

        fb.xor_row(12, 5, 0xFF);
        fb.xor_row(12, 5, 0xFF);
        assert_eq!(fb.pixels(), &before[..]);
    }

    #[test]
    fn rows_clip_at_the_right_edge() {
        let mut fb = FrameBuffer::new();
        fb.xor_row(62, 0, 0xFF);
        assert_eq!(px(&fb, 62, 0), 1);
        assert_eq!(px(&fb, 63, 0), 1);
        // nothing wrapped onto the next row
        assert_eq!(px(&fb, 0, 1), 0);
        assert_eq!(px(&fb, 1, 1), 0);
    }
}
