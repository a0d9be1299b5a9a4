//! 1-bit sprite sheets

/// A strip of equally sized 1-bpp sprites
///
/// Each sprite is `height` rows of `ceil(width / 8)` bytes, MSB first,
/// sprites stored back to back.
#[derive(Debug, Clone, Copy)]
pub struct SpriteSheet<'a> {
    pub width: u16,
    pub height: u16,
    pub data: &'a [u8],
}

impl<'a> SpriteSheet<'a> {
    pub const fn new(width: u16, height: u16, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    fn row_bytes(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    fn sprite_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }

    /// Number of complete sprites in the sheet
    pub fn len(&self) -> usize {
        match self.sprite_bytes() {
            0 => 0,
            n => self.data.len() / n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether pixel (`x`, `y`) of sprite `index` is set
    pub fn is_set(&self, index: usize, x: u16, y: u16) -> bool {
        if index >= self.len() || x >= self.width || y >= self.height {
            return false;
        }
        let offset = index * self.sprite_bytes() + y as usize * self.row_bytes() + x as usize / 8;
        self.data[offset] & (0x80 >> (x % 8)) != 0
    }
}
