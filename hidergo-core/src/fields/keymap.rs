//! Keymap rebinding records (`ConfigKey::KEYMAP`)
//!
//! The KEYMAP field is an array of packed 11-byte items:
//! ```text
//! key:u16 = (position << 4) | layer, device:u8, param1:u32, param2:u32
//! ```
//! `device` indexes [`BEHAVIOR_DEVICES`]; the top bit is reserved and
//! ignored on lookup. An all-zero item is an unused slot.

use super::FieldValue;

/// Size of one packed item
pub const KEYMAP_ITEM_SIZE: usize = 11;

/// Items held by the KEYMAP field
pub const MAX_KEYMAP_ITEMS: usize = 64;

/// Size of the KEYMAP field
pub const KEYMAP_FIELD_SIZE: usize = KEYMAP_ITEM_SIZE * MAX_KEYMAP_ITEMS;

/// Behavior device names, indexed by item device id
pub const BEHAVIOR_DEVICES: [&str; 31] = [
    "TRANS",
    "BCKLGHT",
    "BLUETOOTH",
    "CAPS_WORD",
    "EXT_POWER",
    "GRAVE_ESCAPE",
    "KEY_PRESS",
    "KEY_REPEAT",
    "KEY_TOGGLE",
    "LAYER_TAP",
    "MAC_TAP",
    "MAC_PRESS",
    "MAC_REL",
    "MAC_TAP_TIME",
    "MAC_WAIT_TIME",
    "MAC_WAIT_REL",
    "MOD_TAP",
    "MO",
    "MOUSE_KEY_PRESS",
    "MOUSE_MOVE",
    "MOUSE_SCROLL",
    "NONE",
    "OUTPUTS",
    "RESET",
    "BOOTLOAD",
    "RGB_UG",
    "ENC_KEY_PRESS",
    "STICKY_KEY",
    "STICKY_LAYER",
    "TO_LAYER",
    "TOGGLE_LAYER",
];

/// Device name for a device id
pub fn device_name(id: u8) -> Option<&'static str> {
    BEHAVIOR_DEVICES.get((id & 0x7F) as usize).copied()
}

/// Device id for a device name
pub fn device_id(name: &str) -> Option<u8> {
    BEHAVIOR_DEVICES
        .iter()
        .position(|&n| n == name)
        .map(|i| i as u8)
}

/// A behavior bound to a key position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BehaviorBinding<'a> {
    pub behavior: &'a str,
    pub param1: u32,
    pub param2: u32,
}

/// One rebound key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeymapItem {
    pub key: u16,
    pub device: u8,
    pub param1: u32,
    pub param2: u32,
}

impl KeymapItem {
    /// Key position index
    pub fn position(&self) -> u16 {
        self.key >> 4
    }

    /// Layer index (0..=15)
    pub fn layer(&self) -> u8 {
        (self.key & 0x0F) as u8
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve into a behavior binding
    pub fn to_binding(&self) -> Option<BehaviorBinding<'static>> {
        Some(BehaviorBinding {
            behavior: device_name(self.device)?,
            param1: self.param1,
            param2: self.param2,
        })
    }

    /// Build an item from a behavior binding at `position` on `layer`
    pub fn from_binding(binding: &BehaviorBinding<'_>, layer: u8, position: u16) -> Option<Self> {
        Some(Self {
            key: (position << 4) | (layer & 0x0F) as u16,
            device: device_id(binding.behavior)?,
            param1: binding.param1,
            param2: binding.param2,
        })
    }
}

impl FieldValue for KeymapItem {
    const SIZE: usize = KEYMAP_ITEM_SIZE;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; KEYMAP_ITEM_SIZE] = bytes.try_into().ok()?;
        Some(Self {
            key: u16::from_le_bytes([bytes[0], bytes[1]]),
            device: bytes[2],
            param1: u32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
            param2: u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]),
        })
    }

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.key.to_le_bytes());
        out[2] = self.device;
        out[3..7].copy_from_slice(&self.param1.to_le_bytes());
        out[7..11].copy_from_slice(&self.param2.to_le_bytes());
    }
}

/// Iterate over the used items of a KEYMAP field value
pub fn keymap_items(field: &[u8]) -> impl Iterator<Item = KeymapItem> + '_ {
    field
        .chunks_exact(KEYMAP_ITEM_SIZE)
        .filter_map(KeymapItem::decode)
        .filter(|item| !item.is_empty())
}

/// Look up the rebinding for `position` on `layer`
pub fn find_binding(field: &[u8], layer: u8, position: u16) -> Option<BehaviorBinding<'static>> {
    keymap_items(field)
        .find(|item| item.layer() == layer && item.position() == position)
        .and_then(|item| item.to_binding())
}
