//! Configuration keys and field flags

use bitflags::bitflags;
use hidergo_hal::RecordKey;

/// Numeric identifier of a configuration field
///
/// The key space is partitioned by convention:
/// - `0x0001..=0x3FFF` fields that are normally persisted
/// - `0x4000..=0x7FFF` transient fields (time, live state)
/// - `0x8000..=0xFFFF` device-specific custom fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigKey(pub u16);

impl ConfigKey {
    /// Reserved, never bindable
    pub const INVALID: Self = Self(0x0000);
    /// Device info (`DeviceInfo`)
    pub const DEVICE_INFO: Self = Self(0x0001);
    /// Sleep timeout in seconds (u16, 0 = never)
    pub const SLEEP_TIMEOUT: Self = Self(0x000A);
    /// Peripheral sleep timeout in seconds (u16, 0 = never)
    pub const PERIPHERAL_SLEEP_TIMEOUT: Self = Self(0x000B);
    /// Rebound keymap items
    pub const KEYMAP: Self = Self(0x0020);
    /// Mouse sensitivity (u8)
    pub const MOUSE_SENSITIVITY: Self = Self(0x0040);
    /// Vertical scroll sensitivity (u8)
    pub const SCROLL_SENSITIVITY: Self = Self(0x0041);
    /// Horizontal pan sensitivity (u8)
    pub const PAN_SENSITIVITY: Self = Self(0x0042);
    /// Scroll direction (u8)
    pub const SCROLL_DIRECTION: Self = Self(0x0043);
    /// Trackpad click type (u8)
    pub const TP_CLICK_TYPE: Self = Self(0x0044);
    /// Display layout source
    pub const DISPLAY_LAYOUT: Self = Self(0x0060);
    /// Wall clock time (`DateTime`), never persisted
    pub const DATETIME: Self = Self(0x4000);
    /// Trackpad controller register blob
    pub const TRACKPAD_REGISTERS: Self = Self(0x8001);

    /// Which range of the key space this key falls in
    pub const fn class(self) -> KeyClass {
        match self.0 {
            0x0000 => KeyClass::Invalid,
            0x0001..=0x3FFF => KeyClass::Saveable,
            0x4000..=0x7FFF => KeyClass::Transient,
            _ => KeyClass::Custom,
        }
    }

    /// Flash record id of this key
    pub const fn record(self) -> RecordKey {
        RecordKey(self.0)
    }
}

impl From<u16> for ConfigKey {
    fn from(value: u16) -> Self {
        ConfigKey(value)
    }
}

/// Key space partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyClass {
    Invalid,
    Saveable,
    Transient,
    Custom,
}

bitflags! {
    /// Field status flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u8 {
        /// Field may be persisted
        const SAVEABLE = 1 << 0;
        /// Current value was loaded from or matches flash
        const READ = 1 << 1;
        /// Current value has been committed to flash
        const WRITTEN = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FieldFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FieldFlags({=u8:#x})", self.bits());
    }
}
