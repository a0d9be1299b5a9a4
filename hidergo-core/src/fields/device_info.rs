//! Device information record (`ConfigKey::DEVICE_INFO`)
//!
//! Layout, 115 bytes:
//! ```text
//! device_name[32] manufacturer[24] product[24] serial[32] layout layer_count key_count
//! ```
//! Strings are NUL padded; a string filling its slot has no terminator.

use heapless::String;

use super::FieldValue;

const NAME_LEN: usize = 32;
const MANUFACTURER_LEN: usize = 24;
const PRODUCT_LEN: usize = 24;
const SERIAL_LEN: usize = 32;

/// Physical key layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum KeyboardLayout {
    #[default]
    Unknown = 0,
    Iso = 1,
    Ansi = 2,
}

impl KeyboardLayout {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => KeyboardLayout::Iso,
            2 => KeyboardLayout::Ansi,
            _ => KeyboardLayout::Unknown,
        }
    }
}

/// Device identification reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub device_name: String<NAME_LEN>,
    pub manufacturer: String<MANUFACTURER_LEN>,
    pub product: String<PRODUCT_LEN>,
    pub serial: String<SERIAL_LEN>,
    pub layout: KeyboardLayout,
    pub layer_count: u8,
    pub key_count: u8,
}

fn decode_str<const N: usize>(bytes: &[u8]) -> Option<String<N>> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = core::str::from_utf8(&bytes[..end]).ok()?;
    let mut s = String::new();
    s.push_str(text).ok()?;
    Some(s)
}

fn encode_str(s: &str, out: &mut [u8]) {
    out.fill(0);
    let len = s.len().min(out.len());
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
}

impl FieldValue for DeviceInfo {
    const SIZE: usize = NAME_LEN + MANUFACTURER_LEN + PRODUCT_LEN + SERIAL_LEN + 3;

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let (name, rest) = bytes.split_at(NAME_LEN);
        let (manufacturer, rest) = rest.split_at(MANUFACTURER_LEN);
        let (product, rest) = rest.split_at(PRODUCT_LEN);
        let (serial, rest) = rest.split_at(SERIAL_LEN);

        Some(Self {
            device_name: decode_str(name)?,
            manufacturer: decode_str(manufacturer)?,
            product: decode_str(product)?,
            serial: decode_str(serial)?,
            layout: KeyboardLayout::from_u8(rest[0]),
            layer_count: rest[1],
            key_count: rest[2],
        })
    }

    fn encode(&self, out: &mut [u8]) {
        let (name, rest) = out.split_at_mut(NAME_LEN);
        let (manufacturer, rest) = rest.split_at_mut(MANUFACTURER_LEN);
        let (product, rest) = rest.split_at_mut(PRODUCT_LEN);
        let (serial, rest) = rest.split_at_mut(SERIAL_LEN);

        encode_str(&self.device_name, name);
        encode_str(&self.manufacturer, manufacturer);
        encode_str(&self.product, product);
        encode_str(&self.serial, serial);
        rest[0] = self.layout as u8;
        rest[1] = self.layer_count;
        rest[2] = self.key_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceInfo {
        DeviceInfo {
            device_name: String::try_from("hid:ergo").unwrap(),
            manufacturer: String::try_from("hidergo").unwrap(),
            product: String::try_from("Split 46").unwrap(),
            serial: String::try_from("0123456789abcdef0123456789abcdef").unwrap(),
            layout: KeyboardLayout::Iso,
            layer_count: 4,
            key_count: 46,
        }
    }

    #[test]
    fn test_device_info_size() {
        assert_eq!(DeviceInfo::SIZE, 115);
    }

    #[test]
    fn test_device_info_layout() {
        let mut buf = [0xFFu8; 115];
        sample().encode(&mut buf);

        assert_eq!(&buf[..8], b"hid:ergo");
        assert!(buf[8..32].iter().all(|&b| b == 0));
        assert_eq!(&buf[32..39], b"hidergo");
        // Full-width serial has no terminator
        assert_eq!(&buf[80..112], b"0123456789abcdef0123456789abcdef");
        assert_eq!(&buf[112..], &[1, 4, 46]);

        assert_eq!(DeviceInfo::decode(&buf), Some(sample()));
    }

    #[test]
    fn test_device_info_rejects_bad_input() {
        assert_eq!(DeviceInfo::decode(&[0u8; 114]), None);

        let mut buf = [0u8; 115];
        buf[0] = 0xFF; // not UTF-8
        assert_eq!(DeviceInfo::decode(&buf), None);
    }

    #[test]
    fn test_unknown_layout_value() {
        let mut buf = [0u8; 115];
        buf[112] = 9;
        assert_eq!(
            DeviceInfo::decode(&buf).unwrap().layout,
            KeyboardLayout::Unknown
        );
    }
}
