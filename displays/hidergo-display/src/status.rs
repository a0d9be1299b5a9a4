//! Standard status bindings
//!
//! Binding ids and helpers shared by the firmware and layouts sent from the
//! host.

use crate::bindings::{BindingError, BindingId, Bindings, Value};
use crate::clock::WallClock;

pub const BIND_VIEW: BindingId = 1;
pub const BIND_BATT_PERCENT: BindingId = 2;
pub const BIND_BATT_SPRITE: BindingId = 3;
pub const BIND_CHARGING: BindingId = 4;
pub const BIND_TIME: BindingId = 5;
pub const BIND_DATE: BindingId = 6;

/// Values of `BIND_VIEW`
pub const VIEW_MAIN: i32 = 0;
pub const VIEW_SLEEP: i32 = 1;

/// Index of the first battery sprite in the status sheet
pub const SPRITES_OFFSET_BATTERY: usize = 9;

/// Battery sprite relative to [`SPRITES_OFFSET_BATTERY`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BatteryIcon {
    Full = 0,
    ThreeQuarters = 1,
    Half = 2,
    Quarter = 3,
    Empty = 4,
    Charging = 6,
}

impl BatteryIcon {
    /// Icon for a charge level, or the charging icon while USB powered
    pub fn for_level(percent: u8, usb_powered: bool) -> Self {
        if usb_powered {
            return BatteryIcon::Charging;
        }
        match percent {
            0..=10 => BatteryIcon::Empty,
            11..=30 => BatteryIcon::Quarter,
            31..=60 => BatteryIcon::Half,
            61..=85 => BatteryIcon::ThreeQuarters,
            _ => BatteryIcon::Full,
        }
    }

    /// Absolute index in the status sprite sheet
    pub fn sprite_index(self) -> usize {
        SPRITES_OFFSET_BATTERY + self as usize
    }
}

/// Single-cell LiPo discharge curve, (millivolts, percent), descending
const LIPO_CURVE: &[(u16, u8)] = &[
    (4200, 100),
    (4100, 90),
    (4000, 80),
    (3900, 65),
    (3800, 50),
    (3700, 30),
    (3600, 15),
    (3500, 5),
    (3300, 0),
];

/// Estimate the charge of a LiPo cell from its voltage
///
/// Linear between the points of the discharge curve.
pub fn percent_from_millivolts(mv: u16) -> u8 {
    let (top_mv, top_pct) = LIPO_CURVE[0];
    if mv >= top_mv {
        return top_pct;
    }
    for pair in LIPO_CURVE.windows(2) {
        let (hi_mv, hi_pct) = pair[0];
        let (lo_mv, lo_pct) = pair[1];
        if mv >= lo_mv {
            let span = (hi_mv - lo_mv) as u32;
            let pos = (mv - lo_mv) as u32;
            return lo_pct + ((hi_pct - lo_pct) as u32 * pos / span) as u8;
        }
    }
    0
}

/// Bindings with the standard ids registered
pub fn standard_bindings<const N: usize>() -> Result<Bindings<N>, BindingError> {
    let mut b = Bindings::new();
    b.add("VIEW", BIND_VIEW, Value::Int(VIEW_MAIN))?;
    b.add("BATT_PERCENT", BIND_BATT_PERCENT, Value::Int(0))?;
    b.add(
        "BATT_SPRITE",
        BIND_BATT_SPRITE,
        Value::Int(BatteryIcon::Empty.sprite_index() as i32),
    )?;
    b.add("CHRG", BIND_CHARGING, Value::Bool(false))?;
    b.add("TIME", BIND_TIME, Value::Str(heapless::String::new()))?;
    b.add("DATE", BIND_DATE, Value::Str(heapless::String::new()))?;
    Ok(b)
}

/// Publish battery state
pub fn set_battery<const N: usize>(
    bindings: &mut Bindings<N>,
    percent: u8,
    usb_powered: bool,
) -> Result<(), BindingError> {
    let percent = percent.min(100);
    let icon = BatteryIcon::for_level(percent, usb_powered);
    bindings.set_int(BIND_BATT_PERCENT, percent as i32)?;
    bindings.set_int(BIND_BATT_SPRITE, icon.sprite_index() as i32)?;
    bindings.set_bool(BIND_CHARGING, usb_powered)
}

/// Publish the time and date text
pub fn set_clock<const N: usize>(
    bindings: &mut Bindings<N>,
    clock: &WallClock,
    now_ms: u64,
) -> Result<(), BindingError> {
    bindings.set_str(BIND_TIME, &clock.format_time(now_ms))?;
    bindings.set_str(BIND_DATE, &clock.format_date(now_ms))
}
