//! Binary layout format
//!
//! ```text
//! header:  'H' 'L' version:u8 count:u8
//! element: kind:u8 cond_binding:u8 cond_value:i16 params...
//! ```
//!
//! `cond_binding` 0 means always visible. All multi-byte fields are little
//! endian. A parameter is `binding:u8 value:i16`; binding 0 means the fixed
//! value is used.
//!
//! | kind | params |
//! |------|--------|
//! | 1 text   | x:i16 y:i16 size:u8 binding:u8, then len:u8 bytes when binding is 0 |
//! | 2 hline  | x:i16 y:i16 len:i16 |
//! | 3 vline  | x:i16 y:i16 len:i16 |
//! | 4 box    | x:i16 y:i16 w:u16 h:u16 |
//! | 5 arc    | cx:i16 cy:i16 r:i16 start:u16 percent:param |
//! | 6 sprite | x:i16 y:i16 sheet:u8 index:param |

use heapless::{String, Vec};

use super::element::{Condition, Element, Param, Shape, TextSource};
use super::LayoutError;
use crate::geometry::Rect;

pub const MAGIC: [u8; 2] = *b"HL";
pub const VERSION: u8 = 1;

const KIND_TEXT: u8 = 1;
const KIND_HLINE: u8 = 2;
const KIND_VLINE: u8 = 3;
const KIND_BOX: u8 = 4;
const KIND_ARC: u8 = 5;
const KIND_SPRITE: u8 = 6;

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        let end = self.pos.checked_add(n).ok_or(LayoutError::Malformed)?;
        let bytes = self.data.get(self.pos..end).ok_or(LayoutError::Malformed)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, LayoutError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, LayoutError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> Result<i16, LayoutError> {
        Ok(self.u16()? as i16)
    }

    fn param(&mut self) -> Result<Param, LayoutError> {
        let binding = self.u8()?;
        let value = self.i16()?;
        Ok(match binding {
            0 => Param::Fixed(value as i32),
            id => Param::Bound(id),
        })
    }
}

struct Writer<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), LayoutError> {
        let end = self.pos + bytes.len();
        self.out
            .get_mut(self.pos..end)
            .ok_or(LayoutError::BufferTooSmall)?
            .copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn u8(&mut self, v: u8) -> Result<(), LayoutError> {
        self.put(&[v])
    }

    fn u16(&mut self, v: u16) -> Result<(), LayoutError> {
        self.put(&v.to_le_bytes())
    }

    fn i16(&mut self, v: i16) -> Result<(), LayoutError> {
        self.put(&v.to_le_bytes())
    }

    fn param(&mut self, p: &Param) -> Result<(), LayoutError> {
        match p {
            Param::Fixed(v) => {
                let v = i16::try_from(*v).map_err(|_| LayoutError::Malformed)?;
                self.u8(0)?;
                self.i16(v)
            }
            Param::Bound(id) => {
                self.u8(*id)?;
                self.i16(0)
            }
        }
    }
}

/// Parse a layout, at most `E` elements
pub fn decode<const E: usize>(data: &[u8]) -> Result<Vec<Element, E>, LayoutError> {
    let mut r = Reader { data, pos: 0 };
    if r.take(2)? != &MAGIC[..] {
        return Err(LayoutError::Malformed);
    }
    if r.u8()? != VERSION {
        return Err(LayoutError::UnsupportedVersion);
    }
    let count = r.u8()? as usize;
    if count > E {
        return Err(LayoutError::TooManyElements);
    }

    let mut elements = Vec::new();
    for _ in 0..count {
        let kind = r.u8()?;
        let cond_binding = r.u8()?;
        let cond_value = r.i16()?;
        let shape = match kind {
            KIND_TEXT => {
                let x = r.i16()?;
                let y = r.i16()?;
                let size = r.u8()?;
                let source = match r.u8()? {
                    0 => {
                        let len = r.u8()? as usize;
                        let bytes = r.take(len)?;
                        let text = core::str::from_utf8(bytes).map_err(|_| LayoutError::Malformed)?;
                        TextSource::Literal(
                            String::try_from(text).map_err(|_| LayoutError::TextTooLong)?,
                        )
                    }
                    id => TextSource::Bound(id),
                };
                Shape::Text { x, y, size, source }
            }
            KIND_HLINE => Shape::HLine {
                x: r.i16()?,
                y: r.i16()?,
                len: r.i16()?,
            },
            KIND_VLINE => Shape::VLine {
                x: r.i16()?,
                y: r.i16()?,
                len: r.i16()?,
            },
            KIND_BOX => Shape::Box {
                rect: Rect::new(r.i16()?, r.i16()?, r.u16()?, r.u16()?),
            },
            KIND_ARC => Shape::Arc {
                cx: r.i16()?,
                cy: r.i16()?,
                radius: r.i16()?,
                start: r.u16()?,
                percent: r.param()?,
            },
            KIND_SPRITE => Shape::Sprite {
                x: r.i16()?,
                y: r.i16()?,
                sheet: r.u8()?,
                index: r.param()?,
            },
            _ => return Err(LayoutError::Malformed),
        };
        let when = match cond_binding {
            0 => None,
            binding => Some(Condition {
                binding,
                equals: cond_value as i32,
            }),
        };
        // count <= E was checked above
        let _ = elements.push(Element { shape, when });
    }
    Ok(elements)
}

/// Serialize a layout into `out`, returning the bytes written
pub fn encode(elements: &[Element], out: &mut [u8]) -> Result<usize, LayoutError> {
    let count = u8::try_from(elements.len()).map_err(|_| LayoutError::TooManyElements)?;
    let mut w = Writer { out, pos: 0 };
    w.put(&MAGIC)?;
    w.u8(VERSION)?;
    w.u8(count)?;

    for el in elements {
        let kind = match el.shape {
            Shape::Text { .. } => KIND_TEXT,
            Shape::HLine { .. } => KIND_HLINE,
            Shape::VLine { .. } => KIND_VLINE,
            Shape::Box { .. } => KIND_BOX,
            Shape::Arc { .. } => KIND_ARC,
            Shape::Sprite { .. } => KIND_SPRITE,
        };
        w.u8(kind)?;
        match el.when {
            None => {
                w.u8(0)?;
                w.i16(0)?;
            }
            Some(c) => {
                w.u8(c.binding)?;
                w.i16(i16::try_from(c.equals).map_err(|_| LayoutError::Malformed)?)?;
            }
        }

        match &el.shape {
            Shape::Text { x, y, size, source } => {
                w.i16(*x)?;
                w.i16(*y)?;
                w.u8(*size)?;
                match source {
                    TextSource::Bound(id) => w.u8(*id)?,
                    TextSource::Literal(s) => {
                        w.u8(0)?;
                        w.u8(s.len() as u8)?;
                        w.put(s.as_bytes())?;
                    }
                }
            }
            Shape::HLine { x, y, len } | Shape::VLine { x, y, len } => {
                w.i16(*x)?;
                w.i16(*y)?;
                w.i16(*len)?;
            }
            Shape::Box { rect } => {
                w.i16(rect.x)?;
                w.i16(rect.y)?;
                w.u16(rect.w)?;
                w.u16(rect.h)?;
            }
            Shape::Arc {
                cx,
                cy,
                radius,
                start,
                percent,
            } => {
                w.i16(*cx)?;
                w.i16(*cy)?;
                w.i16(*radius)?;
                w.u16(*start)?;
                w.param(percent)?;
            }
            Shape::Sprite {
                x,
                y,
                sheet,
                index,
            } => {
                w.i16(*x)?;
                w.i16(*y)?;
                w.u8(*sheet)?;
                w.param(index)?;
            }
        }
    }
    Ok(w.pos)
}
