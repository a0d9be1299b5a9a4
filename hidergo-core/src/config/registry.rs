//! Configuration field registry
//!
//! Owns every bound configuration field and the flash store behind them.
//! Each field carries its own lock, so operations on different keys never
//! wait for each other apart from the short store access.
//!
//! Lock order is always field, then store.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use heapless::Vec;
use hidergo_hal::{ConfigStore, StorageError};

use super::key::{ConfigKey, FieldFlags, KeyClass};
use crate::fields::FieldValue;

/// Largest value a single field may hold
pub const MAX_FIELD_SIZE: usize = 1024;

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Key is already bound
    DuplicateKey,
    /// No free field slot
    CapacityExceeded,
    /// Key 0x0000 cannot be bound
    InvalidKey,
    /// Default value exceeds `MAX_FIELD_SIZE`
    FieldTooLarge,
    /// No field bound for the key
    NotFound,
    /// Operation requires a saveable field
    NotSaveable,
    /// Data length differs from the field size
    SizeMismatch,
    /// Flash store failure
    Storage(StorageError),
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        ConfigError::Storage(e)
    }
}

/// Receives field changes made through the control protocol
pub trait ConfigObserver: Sync {
    /// Called after a field was updated
    ///
    /// Runs with the field locked. Implementations must not call back
    /// into the registry; copy what they need and signal their own task.
    fn on_update(&self, key: ConfigKey, data: &[u8]);
}

/// Mutable part of a field, guarded by the field lock
#[derive(Debug)]
pub struct FieldState {
    flags: FieldFlags,
    data: Vec<u8, MAX_FIELD_SIZE>,
}

impl FieldState {
    /// Current value
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Current value, mutable. The length is fixed at bind time.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Status flags
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }
}

/// A bound configuration field
pub struct Field<'a, M: RawMutex> {
    key: ConfigKey,
    size: usize,
    saveable: bool,
    observer: Option<&'a dyn ConfigObserver>,
    state: Mutex<M, FieldState>,
}

impl<'a, M: RawMutex> Field<'a, M> {
    pub fn key(&self) -> ConfigKey {
        self.key
    }

    /// Size in bytes, fixed at bind time
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_saveable(&self) -> bool {
        self.saveable
    }

    /// Lock the field for reading or modifying its value
    pub async fn lock(&self) -> MutexGuard<'_, M, FieldState> {
        self.state.lock().await
    }
}

/// Registry of configuration fields backed by a [`ConfigStore`]
///
/// Fields are bound once during start-up (`&mut self`); afterwards the
/// registry is shared by reference between tasks.
pub struct ConfigRegistry<'a, M: RawMutex, S: ConfigStore, const N: usize> {
    fields: Vec<Field<'a, M>, N>,
    store: Mutex<M, S>,
}

impl<'a, M: RawMutex, S: ConfigStore, const N: usize> ConfigRegistry<'a, M, S, N> {
    /// Create an empty registry over `store`
    pub fn new(store: S) -> Self {
        Self {
            fields: Vec::new(),
            store: Mutex::new(store),
        }
    }

    /// Bind a new field with a default value
    ///
    /// The field size is the length of `default`. Saveable fields are then
    /// loaded from flash; a missing or unreadable record leaves the default
    /// in place and is not an error.
    pub async fn bind(
        &mut self,
        key: ConfigKey,
        default: &[u8],
        saveable: bool,
        observer: Option<&'a dyn ConfigObserver>,
    ) -> Result<(), ConfigError> {
        if key.class() == KeyClass::Invalid {
            return Err(ConfigError::InvalidKey);
        }
        if self.get(key).is_some() {
            error!("Config {=u16:#06x} bound twice", key.0);
            return Err(ConfigError::DuplicateKey);
        }
        if self.fields.is_full() {
            error!("Config registry full, cannot bind {=u16:#06x}", key.0);
            return Err(ConfigError::CapacityExceeded);
        }

        let mut data = Vec::new();
        data.extend_from_slice(default)
            .map_err(|_| ConfigError::FieldTooLarge)?;

        let flags = if saveable {
            FieldFlags::SAVEABLE
        } else {
            FieldFlags::empty()
        };

        let field = Field {
            key,
            size: default.len(),
            saveable,
            observer,
            state: Mutex::new(FieldState { flags, data }),
        };
        if self.fields.push(field).is_err() {
            return Err(ConfigError::CapacityExceeded);
        }

        if saveable {
            match self.read(key).await {
                Ok(()) => debug!("Config {=u16:#06x} loaded", key.0),
                Err(ConfigError::Storage(StorageError::NotFound)) => {
                    debug!("Config {=u16:#06x} not stored, using default", key.0)
                }
                Err(_e) => warn!("Config {=u16:#06x} load failed: {}", key.0, _e),
            }
        }

        Ok(())
    }

    /// Look up a field. Does not touch flash.
    pub fn get(&self, key: ConfigKey) -> Option<&Field<'a, M>> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Iterate over all bound keys
    pub fn keys(&self) -> impl Iterator<Item = ConfigKey> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    /// Number of bound fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reload a saveable field from flash
    ///
    /// A stored record whose length differs from the field size is
    /// replaced by the current value. The field itself is left untouched.
    pub async fn read(&self, key: ConfigKey) -> Result<(), ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        if !field.saveable {
            return Err(ConfigError::NotSaveable);
        }

        let mut scratch = [0u8; MAX_FIELD_SIZE];
        let mut state = field.state.lock().await;
        let result = {
            let mut store = self.store.lock().await;
            store.read(key.record(), &mut scratch).await
        };

        match result {
            Ok(len) if len == field.size => {
                state.data.copy_from_slice(&scratch[..len]);
                state.flags.insert(FieldFlags::READ | FieldFlags::WRITTEN);
                return Ok(());
            }
            Ok(_) | Err(StorageError::BufferTooSmall) => {}
            Err(e) => {
                state.flags.remove(FieldFlags::READ);
                return Err(e.into());
            }
        }

        // Released before write() takes the same lock
        drop(state);
        warn!("Config {=u16:#06x} stored size mismatch, rewriting", key.0);

        if let Err(e) = self.write(key).await {
            field
                .state
                .lock()
                .await
                .flags
                .remove(FieldFlags::READ | FieldFlags::WRITTEN);
            return Err(e);
        }
        Ok(())
    }

    /// Persist the current value of a saveable field
    pub async fn write(&self, key: ConfigKey) -> Result<(), ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        if !field.saveable {
            return Err(ConfigError::NotSaveable);
        }

        let mut state = field.state.lock().await;
        state.flags.remove(FieldFlags::WRITTEN);

        let result = {
            let mut store = self.store.lock().await;
            store.write(key.record(), &state.data).await
        };

        match result {
            Ok(()) => {
                state.flags.insert(FieldFlags::READ | FieldFlags::WRITTEN);
                trace!("Config {=u16:#06x} written", key.0);
                Ok(())
            }
            Err(e) => {
                error!("Config {=u16:#06x} write failed: {}", key.0, e);
                Err(e.into())
            }
        }
    }

    /// Replace a field value in RAM
    ///
    /// `data` must be exactly the field size; otherwise nothing is copied.
    pub async fn set(&self, key: ConfigKey, data: &[u8]) -> Result<(), ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        if data.len() != field.size {
            return Err(ConfigError::SizeMismatch);
        }
        field.state.lock().await.data.copy_from_slice(data);
        Ok(())
    }

    /// Modify a field value in place
    pub async fn update<F>(&self, key: ConfigKey, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut [u8]),
    {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        let mut state = field.state.lock().await;
        f(state.data_mut());
        Ok(())
    }

    /// Decode a field value
    pub async fn load<T: FieldValue>(&self, key: ConfigKey) -> Result<T, ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        let state = field.state.lock().await;
        T::decode(&state.data).ok_or(ConfigError::SizeMismatch)
    }

    /// Copy a field value into `out`, returning its length
    pub async fn copy_to(&self, key: ConfigKey, out: &mut [u8]) -> Result<usize, ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        let dst = out
            .get_mut(..field.size)
            .ok_or(ConfigError::SizeMismatch)?;
        let state = field.state.lock().await;
        dst.copy_from_slice(&state.data);
        Ok(field.size)
    }

    /// Current flags of a field
    pub async fn flags(&self, key: ConfigKey) -> Result<FieldFlags, ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        let flags = field.state.lock().await.flags;
        Ok(flags)
    }

    /// Run the field's observer, if any, with the current value
    pub async fn notify(&self, key: ConfigKey) -> Result<(), ConfigError> {
        let field = self.get(key).ok_or(ConfigError::NotFound)?;
        if let Some(observer) = field.observer {
            let state = field.state.lock().await;
            observer.on_update(key, &state.data);
        }
        Ok(())
    }

    /// Take the store back, consuming the registry
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_futures::yield_now;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use hidergo_hal::RecordKey;
    use core::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use std::sync::Mutex as StdMutex;
    use std::vec::Vec as StdVec;

    /// In-memory store that yields on every access
    #[derive(Default)]
    pub(crate) struct MockStore {
        pub records: BTreeMap<u16, StdVec<u8>>,
        pub writes: StdVec<(u16, StdVec<u8>)>,
        pub fail_writes: bool,
        pub fail_reads: Rc<Cell<bool>>,
    }

    impl ConfigStore for MockStore {
        async fn read(&mut self, key: RecordKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
            yield_now().await;
            if self.fail_reads.get() {
                return Err(StorageError::Storage);
            }
            let record = self.records.get(&key.0).ok_or(StorageError::NotFound)?;
            if record.len() > buffer.len() {
                return Err(StorageError::BufferTooSmall);
            }
            buffer[..record.len()].copy_from_slice(record);
            Ok(record.len())
        }

        async fn write(&mut self, key: RecordKey, data: &[u8]) -> Result<(), StorageError> {
            yield_now().await;
            if self.fail_writes {
                return Err(StorageError::Full);
            }
            self.records.insert(key.0, data.to_vec());
            self.writes.push((key.0, data.to_vec()));
            Ok(())
        }
    }

    pub(crate) type TestRegistry<'a> = ConfigRegistry<'a, NoopRawMutex, MockStore, 8>;

    const A: ConfigKey = ConfigKey(0x000A);
    const B: ConfigKey = ConfigKey(0x000B);

    #[derive(Default)]
    struct Recorder {
        calls: StdMutex<StdVec<(ConfigKey, StdVec<u8>)>>,
    }

    impl ConfigObserver for Recorder {
        fn on_update(&self, key: ConfigKey, data: &[u8]) {
            self.calls.lock().unwrap().push((key, data.to_vec()));
        }
    }

    #[test]
    fn test_bind_and_get() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[1, 2], true, None).await.unwrap();

            let field = reg.get(A).unwrap();
            assert_eq!(field.size(), 2);
            assert!(field.is_saveable());
            assert_eq!(field.lock().await.data(), &[1, 2]);
            // Nothing stored yet, default kept and not marked read
            let flags = reg.flags(A).await.unwrap();
            assert!(flags.contains(FieldFlags::SAVEABLE));
            assert!(!flags.contains(FieldFlags::READ));
            assert!(reg.get(B).is_none());
        });
    }

    #[test]
    fn test_bind_errors() {
        block_on(async {
            let mut reg: ConfigRegistry<'_, NoopRawMutex, MockStore, 2> =
                ConfigRegistry::new(MockStore::default());

            reg.bind(A, &[0], false, None).await.unwrap();
            assert_eq!(
                reg.bind(A, &[0], false, None).await,
                Err(ConfigError::DuplicateKey)
            );
            assert_eq!(
                reg.bind(ConfigKey::INVALID, &[0], false, None).await,
                Err(ConfigError::InvalidKey)
            );
            assert_eq!(
                reg.bind(B, &[0u8; MAX_FIELD_SIZE + 1], false, None).await,
                Err(ConfigError::FieldTooLarge)
            );
            reg.bind(B, &[0], false, None).await.unwrap();
            assert_eq!(
                reg.bind(ConfigKey(0x0040), &[0], false, None).await,
                Err(ConfigError::CapacityExceeded)
            );
            assert_eq!(reg.len(), 2);
        });
    }

    #[test]
    fn test_bind_loads_stored_value() {
        block_on(async {
            let mut store = MockStore::default();
            store.records.insert(A.0, std::vec![9, 9]);

            let mut reg = TestRegistry::new(store);
            reg.bind(A, &[0, 0], true, None).await.unwrap();

            let field = reg.get(A).unwrap();
            let state = field.lock().await;
            assert_eq!(state.data(), &[9, 9]);
            assert!(state.flags().contains(FieldFlags::READ | FieldFlags::WRITTEN));
        });
    }

    #[test]
    fn test_transient_field_never_touches_store() {
        block_on(async {
            let mut store = MockStore::default();
            store.records.insert(ConfigKey::DATETIME.0, std::vec![1; 8]);

            let mut reg = TestRegistry::new(store);
            reg.bind(ConfigKey::DATETIME, &[0; 8], false, None)
                .await
                .unwrap();

            assert_eq!(reg.get(ConfigKey::DATETIME).unwrap().lock().await.data(), &[0; 8]);
            assert_eq!(reg.write(ConfigKey::DATETIME).await, Err(ConfigError::NotSaveable));
            assert_eq!(reg.read(ConfigKey::DATETIME).await, Err(ConfigError::NotSaveable));
            assert!(reg.into_store().writes.is_empty());
        });
    }

    #[test]
    fn test_roundtrip_across_restart() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[0, 0, 0], true, None).await.unwrap();
            reg.set(A, &[1, 2, 3]).await.unwrap();
            reg.write(A).await.unwrap();
            let store = reg.into_store();

            // Fresh registry over the same flash, bound with the default again
            let mut reg = TestRegistry::new(store);
            reg.bind(A, &[0, 0, 0], true, None).await.unwrap();
            assert_eq!(reg.get(A).unwrap().lock().await.data(), &[1, 2, 3]);
        });
    }

    #[test]
    fn test_size_mismatch_heals_store() {
        block_on(async {
            let mut store = MockStore::default();
            // Older layout, 3 bytes instead of 4
            store.records.insert(A.0, std::vec![7, 7, 7]);

            let mut reg = TestRegistry::new(store);
            reg.bind(A, &[1, 2, 3, 4], true, None).await.unwrap();

            let field = reg.get(A).unwrap();
            {
                let state = field.lock().await;
                assert_eq!(state.data(), &[1, 2, 3, 4]);
                assert!(state.flags().contains(FieldFlags::WRITTEN));
            }
            let store = reg.into_store();
            assert_eq!(store.records[&A.0], std::vec![1, 2, 3, 4]);
        });
    }

    #[test]
    fn test_oversized_record_heals_store() {
        block_on(async {
            let mut store = MockStore::default();
            store.records.insert(A.0, std::vec![0xAA; MAX_FIELD_SIZE + 8]);

            let mut reg = TestRegistry::new(store);
            reg.bind(A, &[5], true, None).await.unwrap();

            assert_eq!(reg.into_store().records[&A.0], std::vec![5]);
        });
    }

    #[test]
    fn test_heal_failure_clears_flags() {
        block_on(async {
            let mut store = MockStore::default();
            store.records.insert(A.0, std::vec![7]);
            store.fail_writes = true;

            let mut reg = TestRegistry::new(store);
            // Load failure is logged, bind still succeeds
            reg.bind(A, &[1, 2], true, None).await.unwrap();

            let flags = reg.flags(A).await.unwrap();
            assert!(!flags.intersects(FieldFlags::READ | FieldFlags::WRITTEN));
            assert_eq!(reg.read(A).await, Err(ConfigError::Storage(StorageError::Full)));
        });
    }

    #[test]
    fn test_read_failure_clears_read_flag() {
        block_on(async {
            let mut store = MockStore::default();
            store.records.insert(A.0, std::vec![3]);
            let fail_reads = store.fail_reads.clone();

            let mut reg = TestRegistry::new(store);
            reg.bind(A, &[0], true, None).await.unwrap();
            assert!(reg.flags(A).await.unwrap().contains(FieldFlags::READ));

            fail_reads.set(true);
            assert_eq!(
                reg.read(A).await,
                Err(ConfigError::Storage(StorageError::Storage))
            );
            let field = reg.get(A).unwrap();
            let state = field.lock().await;
            assert!(!state.flags().contains(FieldFlags::READ));
            assert_eq!(state.data(), &[3]);
        });
    }

    #[test]
    fn test_write_failure_keeps_written_clear() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[1], true, None).await.unwrap();
            reg.write(A).await.unwrap();
            assert!(reg.flags(A).await.unwrap().contains(FieldFlags::WRITTEN));

            let mut store = reg.into_store();
            store.fail_writes = true;
            let mut reg = TestRegistry::new(store);
            reg.bind(A, &[1], true, None).await.unwrap();
            assert_eq!(reg.write(A).await, Err(ConfigError::Storage(StorageError::Full)));
            assert!(!reg.flags(A).await.unwrap().contains(FieldFlags::WRITTEN));
        });
    }

    #[test]
    fn test_set_size_enforced() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[1, 2], false, None).await.unwrap();

            assert_eq!(reg.set(A, &[9]).await, Err(ConfigError::SizeMismatch));
            assert_eq!(reg.set(A, &[9, 9, 9]).await, Err(ConfigError::SizeMismatch));
            assert_eq!(reg.get(A).unwrap().lock().await.data(), &[1, 2]);
            assert_eq!(reg.set(B, &[0]).await, Err(ConfigError::NotFound));
        });
    }

    #[test]
    fn test_load_and_copy() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &300u16.to_le_bytes(), false, None).await.unwrap();

            assert_eq!(reg.load::<u16>(A).await, Ok(300));
            assert_eq!(reg.load::<u8>(A).await, Err(ConfigError::SizeMismatch));

            let mut out = [0u8; 4];
            assert_eq!(reg.copy_to(A, &mut out).await, Ok(2));
            assert_eq!(&out[..2], &300u16.to_le_bytes());
            let mut short = [0u8; 1];
            assert_eq!(reg.copy_to(A, &mut short).await, Err(ConfigError::SizeMismatch));
        });
    }

    #[test]
    fn test_notify_runs_observer() {
        let recorder = Recorder::default();
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[4], false, Some(&recorder)).await.unwrap();
            reg.bind(B, &[5], false, None).await.unwrap();

            reg.notify(A).await.unwrap();
            reg.notify(B).await.unwrap();
        });
        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(A, std::vec![4])]);
    }

    #[test]
    fn test_keys_independent() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[1], true, None).await.unwrap();
            reg.bind(B, &[2], true, None).await.unwrap();

            // Holding A must not block a write of B
            let guard = reg.get(A).unwrap().lock().await;
            reg.write(B).await.unwrap();
            drop(guard);

            assert_eq!(reg.into_store().records[&B.0], std::vec![2]);
        });
    }

    #[test]
    fn test_same_key_writes_serialize() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(A, &[0; 4], true, None).await.unwrap();

            let first = async {
                reg.set(A, &[1; 4]).await.unwrap();
                reg.write(A).await.unwrap();
            };
            let second = async {
                yield_now().await;
                reg.set(A, &[2; 4]).await.unwrap();
                reg.write(A).await.unwrap();
            };
            join(first, second).await;

            let current = reg.get(A).unwrap().lock().await.data().to_vec();
            let store = reg.into_store();
            assert_eq!(store.records[&A.0], current);
            // Every committed record is one whole value
            for (_, data) in &store.writes {
                assert!(data == &[1; 4] || data == &[2; 4]);
            }
            assert_eq!(store.writes.last().unwrap().1, std::vec![2; 4]);
        });
    }
}
