//! Configuration fields bound at start-up
//!
//! Every field the firmware knows about is bound once, before any task
//! runs. Saveable fields pick up their stored value from flash during
//! binding; the rest start from the defaults below.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use hidergo_core::config::ConfigObserver;
use hidergo_core::fields::keymap::KEYMAP_FIELD_SIZE;
use hidergo_core::fields::mouse::DEFAULT_SENSITIVITY;
use hidergo_core::fields::{DeviceInfo, KeyboardLayout};
use hidergo_core::{ConfigKey, ConfigRegistry, FieldValue};
use hidergo_hal_rp2040::flash::Rp2040ConfigStore;

use crate::screen::default_layout;
use crate::tasks::DISPLAY_OBSERVER;

/// Number of fields bound below
pub const MAX_FIELDS: usize = 12;

/// Default sleep timeout in seconds
const DEFAULT_SLEEP_TIMEOUT_S: u16 = 300;

/// Size of the trackpad register blob
const TRACKPAD_REGISTERS_SIZE: usize = 32;

/// The registry shared by all tasks
pub type Registry =
    ConfigRegistry<'static, CriticalSectionRawMutex, Rp2040ConfigStore<'static>, MAX_FIELDS>;

fn device_info() -> DeviceInfo {
    let mut info = DeviceInfo {
        layout: KeyboardLayout::Iso,
        layer_count: 4,
        key_count: 62,
        ..Default::default()
    };
    let _ = info.device_name.push_str("hid:ergo");
    let _ = info.manufacturer.push_str("hidergo");
    let _ = info.product.push_str("hid:ergo split");
    let _ = info.serial.push_str("0001");
    info
}

async fn bind(
    registry: &mut Registry,
    key: ConfigKey,
    default: &[u8],
    saveable: bool,
    observer: Option<&'static dyn ConfigObserver>,
) {
    if let Err(e) = registry.bind(key, default, saveable, observer).await {
        error!("Failed to bind config {=u16:#06x}: {}", key.0, e);
    }
}

/// Bind all configuration fields with their defaults
pub async fn bind_fields(registry: &mut Registry) {
    let mut info = [0u8; DeviceInfo::SIZE];
    device_info().encode(&mut info);
    bind(registry, ConfigKey::DEVICE_INFO, &info, true, None).await;

    let timeout = DEFAULT_SLEEP_TIMEOUT_S.to_le_bytes();
    bind(registry, ConfigKey::SLEEP_TIMEOUT, &timeout, true, None).await;
    bind(registry, ConfigKey::PERIPHERAL_SLEEP_TIMEOUT, &timeout, true, None).await;

    bind(registry, ConfigKey::KEYMAP, &[0u8; KEYMAP_FIELD_SIZE], true, None).await;

    for key in [
        ConfigKey::MOUSE_SENSITIVITY,
        ConfigKey::SCROLL_SENSITIVITY,
        ConfigKey::PAN_SENSITIVITY,
    ] {
        bind(registry, key, &[DEFAULT_SENSITIVITY], true, None).await;
    }
    bind(registry, ConfigKey::SCROLL_DIRECTION, &[0], true, None).await;
    bind(registry, ConfigKey::TP_CLICK_TYPE, &[0], true, None).await;

    bind(
        registry,
        ConfigKey::DISPLAY_LAYOUT,
        &default_layout(),
        true,
        Some(&DISPLAY_OBSERVER),
    )
    .await;
    bind(registry, ConfigKey::DATETIME, &[0u8; 8], false, Some(&DISPLAY_OBSERVER)).await;

    bind(
        registry,
        ConfigKey::TRACKPAD_REGISTERS,
        &[0u8; TRACKPAD_REGISTERS_SIZE],
        true,
        None,
    )
    .await;
}
