//! Wall clock field (`ConfigKey::DATETIME`)
//!
//! Set by the host; never persisted. `timestamp == 0` means unset.

use super::FieldValue;

/// Unix time and timezone offset, both in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub timestamp: i32,
    pub offset: i32,
}

impl DateTime {
    pub fn is_set(&self) -> bool {
        self.timestamp != 0
    }

    /// Local time in seconds, `None` when unset
    pub fn local(&self) -> Option<i64> {
        self.is_set()
            .then(|| self.timestamp as i64 + self.offset as i64)
    }
}

impl FieldValue for DateTime {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; 8] = bytes.try_into().ok()?;
        Some(Self {
            timestamp: i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            offset: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    fn encode(&self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.timestamp.to_le_bytes());
        out[4..8].copy_from_slice(&self.offset.to_le_bytes());
    }
}
