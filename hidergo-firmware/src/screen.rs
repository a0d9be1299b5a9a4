//! Built-in status screen
//!
//! Sprite sheet and the default layout stored in `DISPLAY_LAYOUT` until
//! the host replaces it.

use heapless::{String, Vec};

use hidergo_display::layout::codec;
use hidergo_display::status::{
    BatteryIcon, BIND_BATT_PERCENT, BIND_BATT_SPRITE, BIND_DATE, BIND_TIME, BIND_VIEW,
    SPRITES_OFFSET_BATTERY, VIEW_MAIN, VIEW_SLEEP,
};
use hidergo_display::{Element, Param, Rect, Shape, SpriteSheet, TextSource};

/// Size of the `DISPLAY_LAYOUT` field
pub const LAYOUT_FIELD_SIZE: usize = 256;

/// Most elements a layout may hold
pub const MAX_ELEMENTS: usize = 24;

/// Most bindings the status screen registers
pub const MAX_BINDINGS: usize = 8;

const SPRITE_WIDTH: u16 = 16;
const SPRITE_HEIGHT: u16 = 8;
const SPRITE_COUNT: usize = 16;
const SPRITE_BYTES: usize = 2 * SPRITE_HEIGHT as usize;

/// Battery outline, `bars` of four filled
const fn battery(bars: usize) -> [u16; 8] {
    let mut rows = [0u16; 8];
    rows[0] = 0xFFFC;
    rows[7] = 0xFFFC;
    let mut y = 1;
    while y < 7 {
        rows[y] = 0x8004;
        if y >= 2 && y <= 5 {
            // Terminal
            rows[y] |= 0x0003;
            let mut k = 0;
            while k < bars {
                rows[y] |= 0xC000 >> (2 + 3 * k);
                k += 1;
            }
        }
        y += 1;
    }
    rows
}

const fn charging() -> [u16; 8] {
    let mut rows = battery(0);
    rows[2] |= 0x0300;
    rows[3] |= 0x0600;
    rows[4] |= 0x1F80;
    rows[5] |= 0x0600;
    rows
}

/// Status sheet, indexed as the standard status bindings expect
///
/// Slots below the battery icons stay blank.
const fn status_sprites() -> [u8; SPRITE_COUNT * SPRITE_BYTES] {
    let mut out = [0u8; SPRITE_COUNT * SPRITE_BYTES];
    let mut i = 0;
    while i < SPRITE_COUNT {
        let rows = match i {
            9 => battery(4),
            10 => battery(3),
            11 => battery(2),
            12 => battery(1),
            13 => battery(0),
            15 => charging(),
            _ => [0u16; 8],
        };
        let mut y = 0;
        while y < 8 {
            let bytes = rows[y].to_be_bytes();
            out[i * SPRITE_BYTES + 2 * y] = bytes[0];
            out[i * SPRITE_BYTES + 2 * y + 1] = bytes[1];
            y += 1;
        }
        i += 1;
    }
    out
}

static STATUS_SPRITES: [u8; SPRITE_COUNT * SPRITE_BYTES] = status_sprites();

/// Sheets available to layouts, by index
pub static SHEETS: [SpriteSheet<'static>; 1] =
    [SpriteSheet::new(SPRITE_WIDTH, SPRITE_HEIGHT, &STATUS_SPRITES)];

const _: () = assert!(SPRITES_OFFSET_BATTERY + (BatteryIcon::Charging as usize) < SPRITE_COUNT);

fn literal(text: &str) -> TextSource {
    let mut s = String::new();
    let _ = s.push_str(text);
    TextSource::Literal(s)
}

/// Main view: battery, clock and date. Sleep view: a framed note.
pub fn default_elements() -> Vec<Element, MAX_ELEMENTS> {
    let main = [
        Shape::Sprite {
            x: 2,
            y: 2,
            sheet: 0,
            index: Param::Bound(BIND_BATT_SPRITE),
        },
        Shape::Text {
            x: 22,
            y: 1,
            size: 1,
            source: TextSource::Bound(BIND_BATT_PERCENT),
        },
        Shape::HLine { x: 0, y: 13, len: 80 },
        Shape::Text {
            x: 15,
            y: 30,
            size: 2,
            source: TextSource::Bound(BIND_TIME),
        },
        Shape::Text {
            x: 25,
            y: 56,
            size: 1,
            source: TextSource::Bound(BIND_DATE),
        },
        Shape::Arc {
            cx: 40,
            cy: 100,
            radius: 18,
            start: 270,
            percent: Param::Bound(BIND_BATT_PERCENT),
        },
    ];
    let sleep = [
        Shape::Box {
            rect: Rect::new(4, 4, 72, 120),
        },
        Shape::Text {
            x: 16,
            y: 59,
            size: 1,
            source: literal("sleeping"),
        },
    ];

    let mut elements = Vec::new();
    for shape in main {
        let _ = elements.push(Element::new(shape).when(BIND_VIEW, VIEW_MAIN));
    }
    for shape in sleep {
        let _ = elements.push(Element::new(shape).when(BIND_VIEW, VIEW_SLEEP));
    }
    elements
}

/// The default layout in its stored form, zero padded
pub fn default_layout() -> [u8; LAYOUT_FIELD_SIZE] {
    let mut out = [0u8; LAYOUT_FIELD_SIZE];
    if codec::encode(&default_elements(), &mut out).is_err() {
        defmt::error!("Default layout does not fit the layout field");
    }
    out
}
