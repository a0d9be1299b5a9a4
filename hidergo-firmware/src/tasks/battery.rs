//! Battery monitor task
//!
//! Samples VSYS through the on-board 1/3 divider and the VBUS sense pin,
//! publishing charge and USB power for the status display.

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};
use portable_atomic::Ordering;

use hidergo_display::status::percent_from_millivolts;

use crate::channels::{BATTERY_PERCENT, USB_POWERED};

/// Sampling interval in milliseconds
const POLL_INTERVAL_MS: u64 = 5_000;

/// ADC reference voltage in millivolts
const ADC_REF_MV: u32 = 3300;

/// ADC resolution (12-bit)
const ADC_MAX: u32 = 4096;

/// VSYS is measured through a 3:1 divider
const VSYS_DIVIDER: u32 = 3;

fn vsys_millivolts(raw: u16) -> u16 {
    (raw as u32 * ADC_REF_MV * VSYS_DIVIDER / ADC_MAX) as u16
}

/// Battery task - polls VSYS and VBUS
#[embassy_executor::task]
pub async fn battery_task(
    mut adc: Adc<'static, Async>,
    mut vsys: Channel<'static>,
    vbus: Input<'static>,
) {
    info!("Battery task started");

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));

    loop {
        match adc.read(&mut vsys).await {
            Ok(raw) => {
                let mv = vsys_millivolts(raw);
                let percent = percent_from_millivolts(mv);
                trace!("VSYS {} mV, {}%", mv, percent);
                BATTERY_PERCENT.store(percent, Ordering::Relaxed);
            }
            Err(e) => warn!("VSYS read failed: {}", e),
        }
        USB_POWERED.store(vbus.is_high(), Ordering::Relaxed);

        ticker.next().await;
    }
}
