//! Status display task
//!
//! Ticks the layout once a second: refreshes the battery and clock
//! bindings, redraws what changed and puts the panel back into deep sleep
//! after every tick that drew. After the sleep timeout without activity
//! the sleep view is drawn and the display stops updating until activity
//! resumes.

use defmt::*;
use embassy_rp::gpio::{Input, Output};
use embassy_rp::peripherals::SPI1;
use embassy_rp::spi::{self, Spi};
use embassy_time::{Delay, Duration, Instant, Ticker};
use portable_atomic::Ordering;

use hidergo_core::config::ConfigObserver;
use hidergo_core::fields::DateTime;
use hidergo_core::{ConfigKey, FieldValue};
use hidergo_display::clock::WallClock;
use hidergo_display::status::{self, BIND_VIEW, VIEW_MAIN, VIEW_SLEEP};
use hidergo_display::Layout;
use hidergo_drivers::Il0323;

use crate::channels::{
    ACTIVITY, BATTERY_PERCENT, DATETIME_CHANGED, LAYOUT_CHANGED, USB_POWERED,
};
use crate::config::Registry;
use crate::screen::{default_elements, LAYOUT_FIELD_SIZE, MAX_BINDINGS, MAX_ELEMENTS, SHEETS};

/// Layout tick interval in milliseconds
const DISPLAY_TICK_MS: u64 = 1000;

/// The e-paper panel on SPI1
pub type Panel = Il0323<
    Spi<'static, SPI1, spi::Async>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Input<'static>,
    Delay,
>;

type StatusLayout = Layout<'static, MAX_ELEMENTS, MAX_BINDINGS>;

/// Forwards display-relevant field updates to the display task
pub struct DisplayObserver;

impl ConfigObserver for DisplayObserver {
    fn on_update(&self, key: ConfigKey, data: &[u8]) {
        match key {
            ConfigKey::DISPLAY_LAYOUT => LAYOUT_CHANGED.signal(()),
            ConfigKey::DATETIME => {
                if let Some(dt) = DateTime::decode(data) {
                    DATETIME_CHANGED.signal(dt);
                }
            }
            _ => {}
        }
    }
}

pub static DISPLAY_OBSERVER: DisplayObserver = DisplayObserver;

/// Replace the layout with the stored one
///
/// A stored layout that does not parse keeps the current elements, or the
/// built-in ones if there are none yet.
async fn reload_layout(layout: &mut StatusLayout, registry: &Registry) {
    let mut buf = [0u8; LAYOUT_FIELD_SIZE];
    let loaded = match registry.copy_to(ConfigKey::DISPLAY_LAYOUT, &mut buf).await {
        Ok(len) => layout.load(&buf[..len]).map_err(|e| warn!("Stored layout rejected: {}", e)),
        Err(e) => {
            warn!("Layout field not readable: {}", e);
            Err(())
        }
    };

    match loaded {
        Ok(()) => info!("Layout loaded, {} elements", layout.elements().len()),
        Err(()) if layout.elements().is_empty() => {
            if let Err(e) = layout.set_elements(&default_elements()) {
                error!("Built-in layout rejected: {}", e);
            }
        }
        Err(()) => {}
    }
}

async fn sleep_timeout_ms(registry: &Registry) -> u64 {
    match registry.load::<u16>(ConfigKey::SLEEP_TIMEOUT).await {
        Ok(secs) => secs as u64 * 1000,
        Err(_) => 0,
    }
}

/// Display task - drives the status layout
#[embassy_executor::task]
pub async fn display_task(mut panel: Panel, registry: &'static Registry) {
    info!("Display task started");

    if let Err(e) = panel.init().await {
        error!("Panel init failed: {}", e);
    }

    let bindings = match status::standard_bindings() {
        Ok(b) => b,
        Err(e) => {
            error!("Display bindings failed: {}", e);
            return;
        }
    };
    let mut layout: StatusLayout = Layout::new(bindings, &SHEETS);
    reload_layout(&mut layout, registry).await;

    let mut clock = WallClock::new();
    if let Ok(dt) = registry.load::<DateTime>(ConfigKey::DATETIME).await {
        clock.set(dt.local(), Instant::now().as_millis());
    }

    let mut last_activity = Instant::now().as_millis();
    let mut asleep = false;
    let mut ticker = Ticker::every(Duration::from_millis(DISPLAY_TICK_MS));

    loop {
        ticker.next().await;
        let now = Instant::now().as_millis();

        if LAYOUT_CHANGED.signaled() {
            LAYOUT_CHANGED.reset();
            reload_layout(&mut layout, registry).await;
        }
        if let Some(dt) = DATETIME_CHANGED.try_take() {
            clock.set(dt.local(), now);
        }

        let bindings = layout.bindings_mut();
        if ACTIVITY.signaled() {
            ACTIVITY.reset();
            last_activity = now;
            if asleep {
                asleep = false;
                let _ = bindings.set_int(BIND_VIEW, VIEW_MAIN);
                debug!("Display leaving sleep view");
            }
        }
        if let Err(e) = status::set_battery(
            bindings,
            BATTERY_PERCENT.load(Ordering::Relaxed),
            USB_POWERED.load(Ordering::Relaxed),
        ) {
            warn!("Battery binding failed: {}", e);
        }
        if let Err(e) = status::set_clock(bindings, &clock, now) {
            warn!("Clock binding failed: {}", e);
        }

        if asleep {
            continue;
        }

        let timeout = sleep_timeout_ms(registry).await;
        if timeout != 0 && now.saturating_sub(last_activity) >= timeout {
            asleep = true;
            let _ = layout.bindings_mut().set_int(BIND_VIEW, VIEW_SLEEP);
            info!("Display entering sleep view");
            if let Err(e) = layout.force_update(now, &mut panel).await {
                warn!("Sleep view draw failed: {}", e);
            }
            if let Err(e) = panel.hibernate().await {
                warn!("Panel hibernate failed: {}", e);
            }
            continue;
        }

        match layout.update(now, &mut panel).await {
            Ok(true) => {
                if let Err(e) = panel.hibernate().await {
                    warn!("Panel hibernate failed: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Display update failed: {}", e),
        }
    }
}
