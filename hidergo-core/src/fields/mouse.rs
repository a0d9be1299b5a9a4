//! Mouse and trackpad tuning fields (`0x0040..=0x0044`)
//!
//! Every setting is a single byte in its own field.

use embassy_sync::blocking_mutex::raw::RawMutex;
use hidergo_hal::ConfigStore;

use super::FieldValue;
use crate::config::{ConfigError, ConfigKey, ConfigRegistry};

/// Neutral sensitivity, pointer motion is scaled by `value / 128`
pub const DEFAULT_SENSITIVITY: u8 = 128;

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ScrollDirection {
    #[default]
    Normal = 0,
    Inverted = 1,
}

/// Trackpad tap behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClickType {
    /// Tap anywhere is a left click
    #[default]
    Normal = 0,
    /// Left half left click, right half right click
    Split = 1,
}

impl FieldValue for ScrollDirection {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(ScrollDirection::Normal),
            [1] => Some(ScrollDirection::Inverted),
            _ => None,
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[0] = *self as u8;
    }
}

impl FieldValue for ClickType {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(ClickType::Normal),
            [1] => Some(ClickType::Split),
            _ => None,
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[0] = *self as u8;
    }
}

/// Step a sensitivity value, clamped to `1..=255`
pub fn adjust_sensitivity(current: u8, step: i8) -> u8 {
    (current as i16 + step as i16).clamp(1, 255) as u8
}

/// Step the stored mouse sensitivity, returning the new value
///
/// Changes the RAM value only; the host persists it with a SET.
pub async fn step_sensitivity<M: RawMutex, S: ConfigStore, const N: usize>(
    registry: &ConfigRegistry<'_, M, S, N>,
    step: i8,
) -> Result<u8, ConfigError> {
    let mut value = 0;
    registry
        .update(ConfigKey::MOUSE_SENSITIVITY, |data| {
            if let Some(current) = data.first_mut() {
                *current = adjust_sensitivity(*current, step);
                value = *current;
            }
        })
        .await?;
    Ok(value)
}

/// Scale a pointer delta by a sensitivity value
pub fn scale_motion(delta: i16, sensitivity: u8) -> i16 {
    ((delta as i32 * sensitivity as i32) / DEFAULT_SENSITIVITY as i32)
        .clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
