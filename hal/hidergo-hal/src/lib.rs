//! hid:ergo Hardware Abstraction Layer
//!
//! This crate defines the traits the control and configuration code needs
//! from the platform. Chip-specific HALs (RP2040, ...) implement them so the
//! registry and the control protocol run unchanged on every board, and
//! on the host under test.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (hidergo-firmware, etc.)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  hidergo-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ hidergo-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::ConfigStore`] - Persistent key-value records
//! - [`hid::ReportTx`] - Outbound HID reports

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod hid;

// Re-export key traits at crate root for convenience
pub use flash::{ConfigStore, RecordKey, StorageError};
pub use hid::ReportTx;
