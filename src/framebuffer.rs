//! The monochrome framebuffer and the sprite blitter.
use crate::definitions::display;

/// The pixel state of the chip, one `u64` bitmask per row.
///
/// Bit `63` of a row is the leftmost column, so a whole 8 pixel sprite row
/// can be composited with a single rotate and xor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBuffer([u64; display::HEIGHT]);

impl FrameBuffer {
    pub const fn new() -> Self {
        Self([0; display::HEIGHT])
    }

    /// Will turn off every pixel.
    pub fn clear(&mut self) {
        self.0 = [0; display::HEIGHT];
    }

    /// Composites a sprite at `(x, y)` by xor and reports collisions.
    ///
    /// Every sprite byte is one row of 8 horizontal pixels. Rows land on
    /// `(y + row) % 32` and the byte wraps around the 64 pixel row, so
    /// nothing is ever clipped. Returns true if any pixel was flipped from
    /// set to unset.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (r, &byte) in sprite.iter().enumerate() {
            let row = (y + r) % display::HEIGHT;
            // place the sprite byte at the left edge, then rotate it to the
            // x offset (the rotate keeps the horizontal wraparound intact)
            let bits = ((byte as u64) << (display::WIDTH - 8)).rotate_right(x as u32);
            let old = self.0[row];
            collision |= old & bits != 0;
            self.0[row] = old ^ bits;
        }
        collision
    }

    /// The state of a single pixel, wrapping like the blitter does.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let row = self.0[y % display::HEIGHT];
        let mask = 1 << (display::WIDTH - 1 - (x % display::WIDTH));
        row & mask == mask
    }

    /// The raw row bitmasks, for rendering collaborators.
    pub fn rows(&self) -> &[u64; display::HEIGHT] {
        &self.0
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
