//! Typed views of configuration fields
//!
//! Fields are stored as packed little-endian byte records. These types
//! decode and encode the records the firmware itself interprets.

pub mod datetime;
pub mod device_info;
pub mod keymap;
pub mod mouse;

pub use datetime::DateTime;
pub use device_info::{DeviceInfo, KeyboardLayout};
pub use keymap::{BehaviorBinding, KeymapItem};
pub use mouse::{ClickType, ScrollDirection};

/// A fixed-size value stored in a configuration field
pub trait FieldValue: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Decode from a field record. `None` if the length is wrong.
    fn decode(bytes: &[u8]) -> Option<Self>;

    /// Encode into `out`, which is at least `SIZE` bytes
    fn encode(&self, out: &mut [u8]);
}

impl FieldValue for u8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b] => Some(*b),
            _ => None,
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[0] = *self;
    }
}

impl FieldValue for u16 {
    const SIZE: usize = 2;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 2] = bytes.try_into().ok()?;
        Some(u16::from_le_bytes(bytes))
    }

    fn encode(&self, out: &mut [u8]) {
        out[..2].copy_from_slice(&self.to_le_bytes());
    }
}

/// Encode a value into a new buffer. `None` if `N < T::SIZE`.
pub fn encode_value<T: FieldValue, const N: usize>(value: &T) -> Option<heapless::Vec<u8, N>> {
    let mut buf = heapless::Vec::new();
    buf.resize(T::SIZE, 0).ok()?;
    value.encode(&mut buf);
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_fields() {
        assert_eq!(u8::decode(&[7]), Some(7));
        assert_eq!(u8::decode(&[7, 8]), None);
        assert_eq!(u16::decode(&[0x2C, 0x01]), Some(300));
        assert_eq!(u16::decode(&[0x2C]), None);

        let buf: heapless::Vec<u8, 2> = encode_value(&600u16).unwrap();
        assert_eq!(&buf[..], &[0x58, 0x02]);
        assert!(encode_value::<u16, 1>(&600u16).is_none());
    }
}
