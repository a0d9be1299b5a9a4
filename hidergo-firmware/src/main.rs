//! hid:ergo - Split Keyboard Firmware
//!
//! Main firmware binary for RP2040-based keyboard halves with an e-paper
//! status display. Configuration arrives over the HID control channel,
//! lands in a flash-backed registry and drives what the display shows.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use hidergo_core::ConfigRegistry;
use hidergo_drivers::{Il0323, PanelConfig};
use hidergo_hal_rp2040::flash::Rp2040ConfigStore;

mod channels;
mod config;
mod screen;
mod tasks;

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

/// Panel SPI clock
const PANEL_SPI_HZ: u32 = 4_000_000;

// Registry must live forever for task references
static REGISTRY: StaticCell<config::Registry> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("hid:ergo firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Bind configuration fields, loading stored values from flash
    let store = Rp2040ConfigStore::new(p.FLASH, p.DMA_CH0);
    let registry = REGISTRY.init(ConfigRegistry::new(store));
    config::bind_fields(registry).await;
    let registry: &'static config::Registry = registry;
    info!("Configuration loaded, {} fields", registry.len());

    // Setup SPI1 for the e-paper panel
    // Pin assignments are board-specific (SCK=GPIO10, MOSI=GPIO11, CS=GPIO9,
    // DC=GPIO8, RST=GPIO12, BUSY=GPIO13)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = PANEL_SPI_HZ;
    let spi = Spi::new_txonly(p.SPI1, p.PIN_10, p.PIN_11, p.DMA_CH1, spi_config);

    let panel: tasks::Panel = Il0323::new(
        spi,
        Output::new(p.PIN_9, Level::High),
        Output::new(p.PIN_8, Level::Low),
        Output::new(p.PIN_12, Level::High),
        Input::new(p.PIN_13, Pull::None),
        Delay,
        PanelConfig::default(),
    );

    info!("Panel SPI initialized");

    // Setup ADC for battery sensing
    // VSYS/3 on GPIO29, VBUS sense on GPIO24
    let adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let vsys = Channel::new_pin(p.PIN_29, Pull::None);
    let vbus = Input::new(p.PIN_24, Pull::None);

    // Spawn tasks
    spawner.spawn(tasks::control_task(registry)).unwrap();
    spawner.spawn(tasks::display_task(panel, registry)).unwrap();
    spawner.spawn(tasks::battery_task(adc, vsys, vbus)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
