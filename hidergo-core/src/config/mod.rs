//! Configuration fields
//!
//! Runtime configuration lives in a registry of keyed byte fields. Saveable
//! fields are mirrored into flash, one record per key.

pub mod key;
pub mod registry;

pub use key::{ConfigKey, FieldFlags, KeyClass};
pub use registry::{
    ConfigError, ConfigObserver, ConfigRegistry, Field, FieldState, MAX_FIELD_SIZE,
};
