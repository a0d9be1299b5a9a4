//! Packed 1-bpp framebuffer
//!
//! Rows of `WIDTH / 8` bytes, least significant bit leftmost. Bytes are kept
//! in panel polarity, a set bit is white, so the buffer is sent to the
//! panel as is. Out-of-range coordinates are dropped silently.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};
use hidergo_display::Rect;

/// Panel width in pixels
pub const WIDTH: u16 = 80;
/// Panel height in pixels
pub const HEIGHT: u16 = 128;
/// Bytes per row
pub const ROW_BYTES: usize = WIDTH as usize / 8;
/// Framebuffer size in bytes
pub const BUFFER_SIZE: usize = ROW_BYTES * HEIGHT as usize;
/// Eight white pixels
pub const WHITE: u8 = 0xFF;

#[derive(Clone)]
pub struct Framebuffer {
    data: [u8; BUFFER_SIZE],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub const fn new() -> Self {
        Self {
            data: [WHITE; BUFFER_SIZE],
        }
    }

    fn index(x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some((y * ROW_BYTES + x / 8, 1 << (x % 8)))
    }

    /// Ink a pixel
    pub fn set_pixel(&mut self, x: i32, y: i32) {
        if let Some((i, mask)) = Self::index(x, y) {
            self.data[i] &= !mask;
        }
    }

    /// Return a pixel to white
    pub fn clear_pixel(&mut self, x: i32, y: i32) {
        if let Some((i, mask)) = Self::index(x, y) {
            self.data[i] |= mask;
        }
    }

    /// Whether a pixel is inked
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        Self::index(x, y).is_some_and(|(i, mask)| self.data[i] & mask == 0)
    }

    pub fn hline(&mut self, x: i32, y: i32, len: i32) {
        for px in x.max(0)..(x + len).min(WIDTH as i32) {
            self.set_pixel(px, y);
        }
    }

    pub fn vline(&mut self, x: i32, y: i32, len: i32) {
        for py in y.max(0)..(y + len).min(HEIGHT as i32) {
            self.set_pixel(x, py);
        }
    }

    /// Clear the part of `area` that lies on the panel
    pub fn clear_area(&mut self, area: Rect) {
        let area = area.clip(WIDTH, HEIGHT);
        for y in area.y as i32..area.bottom() {
            for x in area.x as i32..area.right() {
                self.clear_pixel(x, y);
            }
        }
    }

    /// Set every byte, in panel polarity
    pub fn fill(&mut self, byte: u8) {
        self.data.fill(byte);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of row `y` covering columns `x0 / 8 .. x1 / 8`
    ///
    /// `x0` and `x1` must be multiples of 8.
    pub fn row_span(&self, y: u16, x0: u16, x1: u16) -> &[u8] {
        let start = y as usize * ROW_BYTES + x0 as usize / 8;
        let end = y as usize * ROW_BYTES + x1 as usize / 8;
        self.data.get(start..end).unwrap_or(&[])
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            match color {
                BinaryColor::On => self.set_pixel(point.x, point.y),
                BinaryColor::Off => self.clear_pixel(point.x, point.y),
            }
        }
        Ok(())
    }
}
