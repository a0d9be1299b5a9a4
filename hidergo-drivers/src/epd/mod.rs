//! E-paper panel drivers

pub mod il0323;

/// Panel driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// SPI transfer failed
    Spi,
    /// GPIO access failed
    Pin,
    /// BUSY stayed asserted longer than the configured timeout
    BusyTimeout,
    /// Panel used before `init`
    NotInitialized,
    /// Panel in deep sleep, `wake` first
    Hibernating,
}

/// How long to wait for the panel BUSY line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusyTimeout {
    /// Wait as long as it takes
    #[default]
    Never,
    /// Give up after this many milliseconds
    Millis(u32),
}

/// Panel driver configuration
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    pub busy_timeout: BusyTimeout,
}
