//! Screen geometry

/// Narrow to `i16`, saturating at either end
pub fn saturate_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn span(from: i32, to: i32) -> u16 {
    u16::try_from(to - from).unwrap_or(u16::MAX)
}

/// Axis-aligned rectangle in panel pixels
///
/// `x`/`y` may be negative; the covered area is clipped where it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub const fn new(x: i16, y: i16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x as i32 + self.w as i32
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y as i32 + self.h as i32
    }

    /// Overlap of two rectangles, empty if they do not touch
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = (self.x as i32).max(other.x as i32);
        let y0 = (self.y as i32).max(other.y as i32);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Rect::default();
        }
        Rect::new(saturate_i16(x0), saturate_i16(y0), span(x0, x1), span(y0, y1))
    }

    /// Smallest rectangle covering both
    ///
    /// Spans that do not fit a `Rect` are cut short at the far edge.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = (self.x as i32).min(other.x as i32);
        let y0 = (self.y as i32).min(other.y as i32);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(saturate_i16(x0), saturate_i16(y0), span(x0, x1), span(y0, y1))
    }

    /// Clip to a `width` x `height` screen
    pub fn clip(&self, width: u16, height: u16) -> Rect {
        self.intersect(&Rect::new(0, 0, width, height))
    }
}
