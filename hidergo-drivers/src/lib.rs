//! Panel drivers
//!
//! This crate provides the e-paper panel driver behind the status display:
//!
//! - `Framebuffer`, the packed 1-bpp pixel buffer with bounds-checked access
//! - `Il0323`, the 80x128 IL0323 controller over SPI with full and partial
//!   refresh, power management and deep sleep
//!
//! `Il0323` implements `hidergo_display::Canvas`, so a layout can draw to
//! it directly.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod epd;
pub mod framebuffer;

pub use epd::il0323::Il0323;
pub use epd::{BusyTimeout, PanelConfig, PanelError};
pub use framebuffer::Framebuffer;
