//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! The HID endpoint (USB or BLE) feeds `HID_RX` with every control report it
//! receives and drains `HID_TX` into its IN endpoint.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU8};

use hidergo_core::fields::DateTime;
use hidergo_protocol::REPORT_SIZE;

/// One raw control report
pub type Report = [u8; REPORT_SIZE];

/// Queue depth for control reports in each direction
const REPORT_CHANNEL_SIZE: usize = 8;

/// Control reports received from the host
pub static HID_RX: Channel<CriticalSectionRawMutex, Report, REPORT_CHANNEL_SIZE> = Channel::new();

/// Control reports waiting to be sent to the host
pub static HID_TX: Channel<CriticalSectionRawMutex, Report, REPORT_CHANNEL_SIZE> = Channel::new();

/// A new display layout was stored
pub static LAYOUT_CHANGED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// The host set the wall clock
pub static DATETIME_CHANGED: Signal<CriticalSectionRawMutex, DateTime> = Signal::new();

/// The user or host did something; restarts the sleep timeout
pub static ACTIVITY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Battery charge in percent (updated by battery task)
pub static BATTERY_PERCENT: AtomicU8 = AtomicU8::new(0);

/// True while VBUS is present (updated by battery task)
pub static USB_POWERED: AtomicBool = AtomicBool::new(false);
