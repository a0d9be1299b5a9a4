//! Layout engine
//!
//! A layout is a list of [`Element`]s drawn onto a [`Canvas`]. Each call to
//! [`Layout::update`] either redraws the whole screen or, when only bound
//! values changed, clears and redraws the area of each affected element
//! and refreshes just that area on the panel.
//!
//! A full redraw happens on the first update, after
//! [`Layout::request_full_redraw`], once `max_interval_ms` has passed since
//! the last one, or when a binding used in a visibility condition changes.
//! Updates closer together than `min_interval_ms` are skipped.

pub mod codec;
pub mod element;

use heapless::Vec;

use crate::bindings::{BindingError, Bindings};
use crate::canvas::Canvas;
use crate::geometry::Rect;
use crate::sprite::SpriteSheet;

pub use element::{Condition, Element, Param, Shape, TextSource};

/// Default shortest gap between updates
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 300;
/// Default longest gap between full redraws
pub const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;

/// Layout errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// More elements than the layout has room for
    TooManyElements,
    /// Truncated or invalid layout data
    Malformed,
    /// Layout data of an unknown format version
    UnsupportedVersion,
    /// Literal text longer than a binding string
    TextTooLong,
    /// Output buffer too small to encode the layout
    BufferTooSmall,
    Binding(BindingError),
}

impl From<BindingError> for LayoutError {
    fn from(e: BindingError) -> Self {
        LayoutError::Binding(e)
    }
}

/// A set of elements, their bindings and redraw bookkeeping
///
/// `E` is the element capacity, `B` the binding capacity.
pub struct Layout<'s, const E: usize, const B: usize> {
    elements: Vec<Element, E>,
    /// Area each element covered when last drawn, empty if hidden
    drawn: Vec<Rect, E>,
    bindings: Bindings<B>,
    sheets: &'s [SpriteSheet<'s>],
    min_interval_ms: u64,
    max_interval_ms: u64,
    last_update_ms: Option<u64>,
    last_full_ms: u64,
    force: bool,
}

impl<'s, const E: usize, const B: usize> Layout<'s, E, B> {
    pub fn new(bindings: Bindings<B>, sheets: &'s [SpriteSheet<'s>]) -> Self {
        Self {
            elements: Vec::new(),
            drawn: Vec::new(),
            bindings,
            sheets,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            last_update_ms: None,
            last_full_ms: 0,
            force: true,
        }
    }

    pub fn with_intervals(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_interval_ms = min_ms;
        self.max_interval_ms = max_ms;
        self
    }

    pub fn push(&mut self, element: Element) -> Result<(), LayoutError> {
        self.elements
            .push(element)
            .map_err(|_| LayoutError::TooManyElements)?;
        let _ = self.drawn.push(Rect::default());
        self.force = true;
        Ok(())
    }

    /// Replace all elements; the next update redraws everything
    pub fn set_elements(&mut self, elements: &[Element]) -> Result<(), LayoutError> {
        if elements.len() > E {
            return Err(LayoutError::TooManyElements);
        }
        self.elements.clear();
        self.drawn.clear();
        for el in elements {
            self.push(el.clone())?;
        }
        self.force = true;
        Ok(())
    }

    /// Replace all elements from the binary layout format
    ///
    /// On error the current elements are kept.
    pub fn load(&mut self, data: &[u8]) -> Result<(), LayoutError> {
        let elements: Vec<Element, E> = codec::decode(data)?;
        self.set_elements(&elements)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn bindings(&self) -> &Bindings<B> {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings<B> {
        &mut self.bindings
    }

    /// Redraw the whole screen on the next update
    pub fn request_full_redraw(&mut self) {
        self.force = true;
    }

    fn condition_changed(&self) -> bool {
        self.elements
            .iter()
            .filter_map(|el| el.when)
            .any(|c| self.bindings.is_changed(c.binding))
    }

    fn content_changed(&self, el: &Element) -> bool {
        el.content_binding()
            .is_some_and(|id| self.bindings.is_changed(id))
    }

    /// Draw whatever changed since the last update
    ///
    /// Returns `true` if anything was sent to the panel. Bindings stay
    /// marked changed when the panel refresh fails, so the next update
    /// retries.
    pub async fn update<C: Canvas>(&mut self, now_ms: u64, canvas: &mut C) -> Result<bool, C::Error> {
        if !self.force {
            if let Some(last) = self.last_update_ms {
                if now_ms.saturating_sub(last) < self.min_interval_ms {
                    return Ok(false);
                }
            }
        }

        let full = self.force
            || self.last_update_ms.is_none()
            || now_ms.saturating_sub(self.last_full_ms) >= self.max_interval_ms
            || self.condition_changed();
        if full {
            self.redraw_all(now_ms, canvas).await?;
            return Ok(true);
        }

        let (width, height) = canvas.size();
        let mut drew = false;
        for i in 0..self.elements.len() {
            let el = &self.elements[i];
            if !self.content_changed(el) {
                continue;
            }
            let bounds = if el.visible(&self.bindings) {
                el.bounds(canvas, &self.bindings, self.sheets)
            } else {
                Rect::default()
            };
            let area = self.drawn[i].union(&bounds).clip(width, height);
            self.drawn[i] = bounds;
            if area.is_empty() {
                continue;
            }

            canvas.clear(area);
            // The clear may have erased parts of neighbouring elements
            for (j, other) in self.elements.iter().enumerate() {
                if !self.drawn[j].intersect(&area).is_empty() && other.visible(&self.bindings) {
                    other.draw(canvas, &self.bindings, self.sheets);
                }
            }
            canvas.render_part(area).await?;
            drew = true;
        }

        self.bindings.clear_changed();
        self.last_update_ms = Some(now_ms);
        Ok(drew)
    }

    /// Redraw everything now, ignoring the minimum interval
    pub async fn force_update<C: Canvas>(&mut self, now_ms: u64, canvas: &mut C) -> Result<(), C::Error> {
        self.redraw_all(now_ms, canvas).await
    }

    async fn redraw_all<C: Canvas>(&mut self, now_ms: u64, canvas: &mut C) -> Result<(), C::Error> {
        let (width, height) = canvas.size();
        let screen = Rect::new(0, 0, width, height);
        canvas.clear(screen);
        for (el, drawn) in self.elements.iter().zip(self.drawn.iter_mut()) {
            if el.visible(&self.bindings) {
                el.draw(canvas, &self.bindings, self.sheets);
                *drawn = el.bounds(canvas, &self.bindings, self.sheets);
            } else {
                *drawn = Rect::default();
            }
        }
        if let Err(e) = canvas.render_part(screen).await {
            self.force = true;
            return Err(e);
        }

        self.bindings.clear_changed();
        self.force = false;
        self.last_update_ms = Some(now_ms);
        self.last_full_ms = now_ms;
        Ok(())
    }
}
