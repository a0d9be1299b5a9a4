//! Layout elements

use core::fmt::Write;

use heapless::String;

use crate::bindings::{BindingId, Bindings, Value, MAX_BINDING_STR};
use crate::canvas::Canvas;
use crate::geometry::{saturate_i16, Rect};
use crate::sprite::SpriteSheet;

/// Where a text element gets its content
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextSource {
    Literal(String<MAX_BINDING_STR>),
    Bound(BindingId),
}

/// A numeric element parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Param {
    Fixed(i32),
    Bound(BindingId),
}

impl Param {
    fn resolve<const B: usize>(&self, bindings: &Bindings<B>) -> i32 {
        match self {
            Param::Fixed(v) => *v,
            Param::Bound(id) => bindings.get(*id).map(Value::as_int).unwrap_or(0),
        }
    }

    fn binding(&self) -> Option<BindingId> {
        match self {
            Param::Fixed(_) => None,
            Param::Bound(id) => Some(*id),
        }
    }
}

/// What an element draws
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Shape {
    Text {
        x: i16,
        y: i16,
        size: u8,
        source: TextSource,
    },
    HLine {
        x: i16,
        y: i16,
        len: i16,
    },
    VLine {
        x: i16,
        y: i16,
        len: i16,
    },
    /// Rectangle outline
    Box { rect: Rect },
    /// Circular arc starting at `start` degrees, sweeping `percent` of a
    /// full turn
    Arc {
        cx: i16,
        cy: i16,
        radius: i16,
        start: u16,
        percent: Param,
    },
    Sprite {
        x: i16,
        y: i16,
        sheet: u8,
        index: Param,
    },
}

/// Show an element only while a binding has a given value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Condition {
    pub binding: BindingId,
    pub equals: i32,
}

/// One drawable item of a layout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Element {
    pub shape: Shape,
    pub when: Option<Condition>,
}

impl Element {
    pub fn new(shape: Shape) -> Self {
        Self { shape, when: None }
    }

    /// Only show while `binding == equals`
    pub fn when(mut self, binding: BindingId, equals: i32) -> Self {
        self.when = Some(Condition { binding, equals });
        self
    }

    pub fn visible<const B: usize>(&self, bindings: &Bindings<B>) -> bool {
        match self.when {
            None => true,
            Some(c) => bindings.get(c.binding).map(Value::as_int) == Some(c.equals),
        }
    }

    /// Binding the content depends on, if any
    pub fn content_binding(&self) -> Option<BindingId> {
        match &self.shape {
            Shape::Text {
                source: TextSource::Bound(id),
                ..
            } => Some(*id),
            Shape::Arc { percent, .. } => percent.binding(),
            Shape::Sprite { index, .. } => index.binding(),
            _ => None,
        }
    }

    /// Text drawn by a text element
    fn text<const B: usize>(&self, bindings: &Bindings<B>) -> String<MAX_BINDING_STR> {
        let mut out = String::new();
        if let Shape::Text { source, .. } = &self.shape {
            match source {
                TextSource::Literal(s) => out = s.clone(),
                TextSource::Bound(id) => match bindings.get(*id) {
                    Some(Value::Str(s)) => out = s.clone(),
                    Some(Value::Int(v)) => {
                        let _ = write!(out, "{}", v);
                    }
                    Some(Value::Bool(b)) => {
                        let _ = out.push(if *b { '1' } else { '0' });
                    }
                    None => {}
                },
            }
        }
        out
    }

    /// Area the element covers with the current binding values
    pub fn bounds<C: Canvas, const B: usize>(
        &self,
        canvas: &C,
        bindings: &Bindings<B>,
        sheets: &[SpriteSheet<'_>],
    ) -> Rect {
        match &self.shape {
            Shape::Text { x, y, size, .. } => {
                let (w, h) = canvas.text_size(&self.text(bindings), *size);
                Rect::new(*x, *y, w, h)
            }
            Shape::HLine { x, y, len } => Rect::new(*x, *y, (*len).max(0) as u16, 1),
            Shape::VLine { x, y, len } => Rect::new(*x, *y, 1, (*len).max(0) as u16),
            Shape::Box { rect } => *rect,
            Shape::Arc { cx, cy, radius, .. } => {
                let r = (*radius).max(0);
                let d = (2 * r as u16).saturating_add(1);
                Rect::new(cx.saturating_sub(r), cy.saturating_sub(r), d, d)
            }
            Shape::Sprite { x, y, sheet, .. } => match sheets.get(*sheet as usize) {
                Some(s) => Rect::new(*x, *y, s.width, s.height),
                None => Rect::default(),
            },
        }
    }

    /// Draw into the canvas framebuffer
    pub fn draw<C: Canvas, const B: usize>(
        &self,
        canvas: &mut C,
        bindings: &Bindings<B>,
        sheets: &[SpriteSheet<'_>],
    ) {
        match &self.shape {
            Shape::Text { x, y, size, .. } => {
                canvas.text(*x, *y, &self.text(bindings), *size);
            }
            Shape::HLine { x, y, len } => canvas.hline(*x, *y, *len),
            Shape::VLine { x, y, len } => canvas.vline(*x, *y, *len),
            Shape::Box { rect } => {
                // Edges are drawn over the on-screen part only
                let (width, height) = canvas.size();
                let seen = rect.clip(width, height);
                if seen.is_empty() {
                    return;
                }
                let w = i16::try_from(seen.w).unwrap_or(i16::MAX);
                let h = i16::try_from(seen.h).unwrap_or(i16::MAX);
                if rect.y == seen.y {
                    canvas.hline(seen.x, seen.y, w);
                }
                if rect.bottom() == seen.bottom() {
                    canvas.hline(seen.x, saturate_i16(seen.bottom() - 1), w);
                }
                if rect.x == seen.x {
                    canvas.vline(seen.x, seen.y, h);
                }
                if rect.right() == seen.right() {
                    canvas.vline(saturate_i16(seen.right() - 1), seen.y, h);
                }
            }
            Shape::Arc {
                cx,
                cy,
                radius,
                start,
                percent,
            } => {
                let pct = percent.resolve(bindings).clamp(0, 100) as u16;
                let sweep = pct * 360 / 100;
                canvas.arc(*cx, *cy, *radius, *start, start.saturating_add(sweep));
            }
            Shape::Sprite {
                x,
                y,
                sheet,
                index,
            } => {
                let index = index.resolve(bindings);
                if let (Some(s), Ok(i)) = (sheets.get(*sheet as usize), usize::try_from(index)) {
                    canvas.sprite(*x, *y, s, i);
                }
            }
        }
    }
}
