//! Board-agnostic core logic for hid:ergo firmware
//!
//! This crate contains the application logic that does not depend on a
//! specific board:
//!
//! - Configuration registry with flash persistence
//! - Typed configuration field records
//! - Control protocol dispatch (SET/GET/CONNECT)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to later modules
#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod fields;

pub use config::{ConfigError, ConfigKey, ConfigObserver, ConfigRegistry, FieldFlags};
pub use control::{ControlDispatcher, ControlError, ControlService};
pub use fields::FieldValue;
