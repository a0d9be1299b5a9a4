//! Flash configuration store for RP2040
//!
//! Uses sequential-storage for wear-leveled key-value storage
//! in the last 64KB of flash. Each configuration field is one map item.
//!
//! Implements the `ConfigStore` trait from `hidergo-hal`.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use hidergo_hal::flash::{RecordKey, StorageError};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024;
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Scratch size for one serialized item: largest field plus key and item header
const ITEM_BUFFER_SIZE: usize = 1536;

const _: () = assert!(CONFIG_PARTITION_SIZE % FLASH_ERASE_SIZE == 0);

/// RP2040 flash configuration store
pub struct Rp2040ConfigStore<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
    item_buffer: [u8; ITEM_BUFFER_SIZE],
}

impl<'d> Rp2040ConfigStore<'d> {
    /// Create a new store over the flash peripheral
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
            item_buffer: [0u8; ITEM_BUFFER_SIZE],
        }
    }
}

impl<'d> hidergo_hal::ConfigStore for Rp2040ConfigStore<'d> {
    async fn read(&mut self, key: RecordKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let result = map::fetch_item::<RecordKey, &[u8], _>(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut self.item_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(StorageError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(StorageError::NotFound),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Config read {} failed: {}", key, defmt::Debug2Format(&_e));
                Err(StorageError::Storage)
            }
        }
    }

    async fn write(&mut self, key: RecordKey, data: &[u8]) -> Result<(), StorageError> {
        map::store_item(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut self.item_buffer,
            &key,
            &data,
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => StorageError::Full,
            sequential_storage::Error::Corrupted { .. } => StorageError::Corrupted,
            sequential_storage::Error::Storage { .. } => StorageError::Flash,
            _ => StorageError::Storage,
        })
    }
}
