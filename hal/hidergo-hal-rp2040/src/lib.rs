//! RP2040-specific HAL for hid:ergo firmware
//!
//! This crate provides RP2040 implementations of the shared `hidergo-hal`
//! traits:
//!
//! - Flash-backed configuration store (implements `hidergo_hal::ConfigStore`)

#![no_std]

pub mod flash;

// Re-export shared traits from hidergo-hal for convenience
pub use hidergo_hal::{ConfigStore, RecordKey};
