//! Flash storage abstractions
//!
//! Provides traits for persistent key-value storage that can be implemented
//! by chip-specific HALs using their flash memory.

/// Record identifier inside the configuration store
///
/// Every saveable configuration field is persisted as exactly one record,
/// addressed by the field's numeric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordKey(pub u16);

impl RecordKey {
    /// Get the raw record id
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Serialized width of a record key
    pub const SIZE: usize = 2;
}

impl From<u16> for RecordKey {
    fn from(value: u16) -> Self {
        RecordKey(value)
    }
}

/// Errors from flash storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash operation failed
    Flash,
    /// Storage operation failed
    Storage,
    /// Key not found
    NotFound,
    /// Buffer too small for the stored record
    BufferTooSmall,
    /// Data corrupted or invalid
    Corrupted,
    /// Storage is full
    Full,
}

/// Configuration record store
///
/// Wear-leveled key-value storage for configuration fields.
/// Implementations should handle:
/// - Wear leveling across flash sectors
/// - Data integrity (CRC or similar)
/// - Atomic replacement of a record on write
pub trait ConfigStore {
    /// Read a record into the provided buffer
    ///
    /// # Returns
    /// The stored length of the record. A record longer than `buffer`
    /// fails with [`StorageError::BufferTooSmall`].
    fn read(
        &mut self,
        key: RecordKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, StorageError>>;

    /// Store a record, replacing any previous value for the key
    fn write(
        &mut self,
        key: RecordKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), StorageError>>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for RecordKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.len() < RecordKey::SIZE {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[..RecordKey::SIZE].copy_from_slice(&self.0.to_le_bytes());
        Ok(RecordKey::SIZE)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.len() < RecordKey::SIZE {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        let key = u16::from_le_bytes([buffer[0], buffer[1]]);
        Ok((RecordKey(key), RecordKey::SIZE))
    }
}

#[cfg(all(test, feature = "sequential-storage"))]
mod tests {
    use super::*;
    use sequential_storage::map::Key;

    #[test]
    fn test_record_key_serialization() {
        let mut buf = [0u8; 4];
        let len = RecordKey(0x8001).serialize_into(&mut buf).unwrap();
        assert_eq!(len, 2);
        assert_eq!(&buf[..2], &[0x01, 0x80]);

        let (key, used) = RecordKey::deserialize_from(&buf).unwrap();
        assert_eq!(key, RecordKey(0x8001));
        assert_eq!(used, 2);
    }

    #[test]
    fn test_record_key_short_buffer() {
        let mut buf = [0u8; 1];
        assert!(RecordKey(1).serialize_into(&mut buf).is_err());
        assert!(RecordKey::deserialize_from(&buf).is_err());
    }
}
