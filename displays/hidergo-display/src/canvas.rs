//! Canvas trait
//!
//! The drawing surface a panel exposes to the layout engine. Drawing calls
//! only touch the framebuffer; nothing reaches the panel until
//! [`Canvas::render_part`]. Out-of-range coordinates are dropped silently.

use crate::geometry::{saturate_i16, Rect};
use crate::sprite::SpriteSheet;

/// sin(deg) * 1024 for 0..=90 degrees
const SIN_TABLE: [i16; 91] = [
    0, 18, 36, 54, 71, 89, 107, 125, 143, 160, 178, 195, 213, 230, 248, 265, 282, 299, 316, 333,
    350, 367, 384, 400, 416, 433, 449, 465, 481, 496, 512, 527, 543, 558, 573, 587, 602, 616, 630,
    644, 658, 672, 685, 698, 711, 724, 737, 749, 761, 773, 784, 796, 807, 818, 828, 839, 849, 859,
    868, 878, 887, 896, 904, 912, 920, 928, 935, 943, 949, 956, 962, 968, 974, 979, 984, 989, 994,
    998, 1002, 1005, 1008, 1011, 1014, 1016, 1018, 1020, 1022, 1023, 1023, 1024, 1024,
];

/// sin and cos of an angle in whole degrees, scaled by 1024
pub fn sin_cos(deg: u16) -> (i32, i32) {
    let deg = deg % 360;
    let sin = |d: u16| -> i32 {
        match d {
            0..=90 => SIN_TABLE[d as usize] as i32,
            91..=180 => SIN_TABLE[(180 - d) as usize] as i32,
            181..=270 => -(SIN_TABLE[(d - 180) as usize] as i32),
            _ => -(SIN_TABLE[(360 - d) as usize] as i32),
        }
    };
    (sin(deg), sin((deg + 90) % 360))
}

/// Drawing surface for the layout engine
pub trait Canvas {
    /// Error raised when pushing pixels to the panel
    type Error;

    /// Panel size in pixels (width, height)
    fn size(&self) -> (u16, u16);

    /// Clear an area to the background color
    fn clear(&mut self, area: Rect);

    /// Set one pixel
    fn pixel(&mut self, x: i16, y: i16);

    /// Horizontal line of `len` pixels starting at (`x`, `y`)
    fn hline(&mut self, x: i16, y: i16, len: i16) {
        for i in 0..len.max(0) {
            self.pixel(x.saturating_add(i), y);
        }
    }

    /// Vertical line of `len` pixels starting at (`x`, `y`)
    fn vline(&mut self, x: i16, y: i16, len: i16) {
        for i in 0..len.max(0) {
            self.pixel(x, y.saturating_add(i));
        }
    }

    /// Arc around (`cx`, `cy`) from `start` to `end` degrees, clockwise
    /// from 3 o'clock
    fn arc(&mut self, cx: i16, cy: i16, radius: i16, start: u16, end: u16) {
        for deg in start..end {
            let (sin, cos) = sin_cos(deg);
            let x = cx as i32 + (radius as i32 * cos) / 1024;
            let y = cy as i32 + (radius as i32 * sin) / 1024;
            self.pixel(saturate_i16(x), saturate_i16(y));
        }
    }

    /// Draw text with its top-left corner at (`x`, `y`)
    ///
    /// Surfaces without a font draw nothing.
    fn text(&mut self, _x: i16, _y: i16, _text: &str, _size: u8) {}

    /// Size of `text` as drawn by [`Canvas::text`]
    fn text_size(&self, text: &str, size: u8) -> (u16, u16) {
        let size = size.max(1) as u16;
        (text.chars().count() as u16 * 6 * size, 8 * size)
    }

    /// Draw sprite `index` of `sheet` with its top-left corner at (`x`, `y`)
    fn sprite(&mut self, x: i16, y: i16, sheet: &SpriteSheet<'_>, index: usize) {
        for sy in 0..sheet.height {
            for sx in 0..sheet.width {
                if sheet.is_set(index, sx, sy) {
                    self.pixel(x.saturating_add(sx as i16), y.saturating_add(sy as i16));
                }
            }
        }
    }

    /// Push `area` of the framebuffer to the panel
    fn render_part(
        &mut self,
        area: Rect,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::vec::Vec;

    /// Records drawing calls; pixels are kept as a set
    #[derive(Default)]
    pub(crate) struct RecordingCanvas {
        pub pixels: BTreeSet<(i16, i16)>,
        pub clears: Vec<Rect>,
        pub renders: Vec<Rect>,
        pub texts: Vec<(i16, i16, std::string::String)>,
        pub fail_render: bool,
    }

    impl Canvas for RecordingCanvas {
        type Error = ();

        fn size(&self) -> (u16, u16) {
            (80, 128)
        }

        fn clear(&mut self, area: Rect) {
            self.pixels.retain(|&(x, y)| {
                !(x >= area.x && (x as i32) < area.right() && y >= area.y && (y as i32) < area.bottom())
            });
            self.clears.push(area);
        }

        fn pixel(&mut self, x: i16, y: i16) {
            if (0..80).contains(&x) && (0..128).contains(&y) {
                self.pixels.insert((x, y));
            }
        }

        fn text(&mut self, x: i16, y: i16, text: &str, _size: u8) {
            self.texts.push((x, y, text.into()));
        }

        async fn render_part(&mut self, area: Rect) -> Result<(), ()> {
            if self.fail_render {
                return Err(());
            }
            self.renders.push(area);
            Ok(())
        }
    }

    #[test]
    fn test_sin_cos_quadrants() {
        assert_eq!(sin_cos(0), (0, 1024));
        assert_eq!(sin_cos(90), (1024, 0));
        assert_eq!(sin_cos(180), (0, -1024));
        assert_eq!(sin_cos(270), (-1024, 0));
        assert_eq!(sin_cos(360), (0, 1024));
        assert_eq!(sin_cos(210).0, -512);
    }

    #[test]
    fn test_default_lines_clip() {
        let mut canvas = RecordingCanvas::default();
        canvas.hline(78, 0, 5);
        canvas.vline(0, 126, 5);
        assert_eq!(canvas.pixels.len(), 4);
        canvas.hline(0, 5, -3);
        assert_eq!(canvas.pixels.len(), 4);
    }

    #[test]
    fn test_default_arc_quarter() {
        let mut canvas = RecordingCanvas::default();
        canvas.arc(40, 40, 10, 0, 91);
        assert!(canvas.pixels.contains(&(50, 40)));
        assert!(canvas.pixels.contains(&(40, 50)));
        assert!(canvas.pixels.iter().all(|&(x, y)| x >= 40 && y >= 40));
    }

    #[test]
    fn test_default_arc_near_coordinate_limit() {
        let mut canvas = RecordingCanvas::default();
        // The only point lands at x = -65536, which must not wrap to 0
        canvas.arc(i16::MIN, 10, i16::MIN, 0, 1);
        assert!(canvas.pixels.is_empty());
    }

    #[test]
    fn test_default_sprite() {
        let data = [0b1000_0000, 0b0100_0000];
        let sheet = SpriteSheet::new(2, 2, &data);
        let mut canvas = RecordingCanvas::default();
        canvas.sprite(10, 20, &sheet, 0);
        assert_eq!(
            canvas.pixels.iter().copied().collect::<Vec<_>>(),
            std::vec![(10, 20), (11, 21)]
        );
    }
}
