//! IL0323 e-paper controller
//!
//! Driver for the 80x128 IL0323 panel over SPI. Drawing goes to an
//! in-memory [`Framebuffer`]; [`Il0323::refresh`] pushes it to the panel.
//!
//! The panel starts in full mode after [`Il0323::init_full`], where every
//! refresh redraws the whole panel. After [`Il0323::init_partial`] a refresh
//! only updates the requested window, widened to 8-pixel columns.
//!
//! Pins: CS and DC are driven by the driver (DC low for commands), RST is
//! active low, BUSY is active low.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiBus;

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{Drawable, Point};
use embedded_graphics::text::{Baseline, Text};
use hidergo_display::{Canvas, Rect};

use super::{BusyTimeout, PanelConfig, PanelError};
use crate::framebuffer::{Framebuffer, HEIGHT, WHITE, WIDTH};

/// IL0323 commands
mod cmd {
    pub const PANEL_SETTING: u8 = 0x00;
    pub const POWER_OFF: u8 = 0x02;
    pub const POWER_ON: u8 = 0x04;
    pub const DEEP_SLEEP: u8 = 0x07;
    pub const DATA_OLD: u8 = 0x10;
    pub const REFRESH: u8 = 0x12;
    pub const DATA_NEW: u8 = 0x13;
    pub const LUT_WHITE: u8 = 0x23;
    pub const LUT_BLACK: u8 = 0x24;
    pub const PARTIAL_WINDOW: u8 = 0x90;
    pub const PARTIAL_IN: u8 = 0x91;
    pub const PARTIAL_OUT: u8 = 0x92;
}

/// Deep sleep check code
const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// Delay after a power command, before polling BUSY
const POWER_DELAY_MS: u32 = 100;
const RESET_PULSE_MS: u32 = 10;

/// Register program shared by full and partial mode, as
/// `command, length, data...`
#[rustfmt::skip]
const INIT_PROG: &[u8] = &[
    0xD2, 1, 0x3F,
    cmd::PANEL_SETTING, 1, 0x4F, // LUT from OTP
    0x01, 4, 0x03, 0x00, 0x2B, 0x2B, // power setting
    0x06, 1, 0x3F, // charge pump
    0x2A, 2, 0x00, 0x00, // LUT option
    0x30, 1, 0x13, // PLL
    0x50, 1, 0x57, // VCOM and data interval
    0x60, 1, 0x22, // TCON
    0x61, 2, 0x50, 0x80, // resolution 80x128
    0x82, 1, 0x12, // VCOM DC -1V
    0xE3, 1, 0x33, // power saving
];

/// Applied on top of `INIT_PROG` for partial mode
#[rustfmt::skip]
const PART_INIT_PROG: &[u8] = &[
    cmd::PANEL_SETTING, 1, 0x6F, // LUT from registers
    0x30, 1, 0x05, // PLL 15 Hz
    0x50, 1, 0xF2, // VCOM and data interval
    0x82, 1, 0x00, // VCOM DC
];

const LUT_SIZE: usize = 42;

const fn lut<const P: usize>(head: [u8; P]) -> [u8; LUT_SIZE] {
    let mut out = [0; LUT_SIZE];
    let mut i = 0;
    while i < P {
        out[i] = head[i];
        i += 1;
    }
    out
}

const LUT_W_FULL: [u8; LUT_SIZE] = lut([0x60, 0x5A, 0x5A, 0x00, 0x00, 0x01]);
const LUT_B_FULL: [u8; LUT_SIZE] = lut([0x90, 0x5A, 0x5A, 0x00, 0x00, 0x01]);
const LUT_W_PARTIAL: [u8; LUT_SIZE] = lut([
    0x60, 0x01, 0x01, 0x00, 0x00, 0x01, 0x80, 0x0F, 0x00, 0x00, 0x00, 0x01,
]);
const LUT_B_PARTIAL: [u8; LUT_SIZE] = lut([
    0x90, 0x01, 0x01, 0x00, 0x00, 0x01, 0x40, 0x0F, 0x00, 0x00, 0x00, 0x01,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Uninitialized,
    Awake,
    Hibernating,
}

/// Byte-aligned panel window, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    x0: u16,
    x1: u16,
    y0: u16,
    y1: u16,
}

impl Window {
    const FULL: Window = Window {
        x0: 0,
        x1: WIDTH,
        y0: 0,
        y1: HEIGHT,
    };

    /// Clip to the panel and widen to 8-pixel columns, `None` if nothing
    /// is left
    fn from_area(area: Rect) -> Option<Window> {
        let area = area.clip(WIDTH, HEIGHT);
        if area.is_empty() {
            return None;
        }
        let x0 = area.x as u16 & !7;
        let x1 = ((area.right() as u16) + 7) & !7;
        Some(Window {
            x0,
            x1: x1.min(WIDTH),
            y0: area.y as u16,
            y1: area.bottom() as u16,
        })
    }
}

/// Partial window register bytes for an area
///
/// The left edge is rounded down to a byte boundary and the right edge
/// extended to the last pixel of its byte.
pub fn window_bounds(x: u16, y: u16, w: u16, h: u16) -> [u8; 5] {
    let right = x + w.max(1) - 1;
    let bottom = y + h.max(1) - 1;
    [(x & !7) as u8, (right | 7) as u8, y as u8, bottom as u8, 0x00]
}

/// IL0323 panel
pub struct Il0323<SPI, CS, DC, RST, BUSY, D> {
    spi: SPI,
    cs: CS,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: D,
    config: PanelConfig,
    framebuffer: Framebuffer,
    phase: Phase,
    power_on: bool,
    partial_mode: bool,
}

impl<SPI, CS, DC, RST, BUSY, D> Il0323<SPI, CS, DC, RST, BUSY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, cs: CS, dc: DC, rst: RST, busy: BUSY, delay: D, config: PanelConfig) -> Self {
        Self {
            spi,
            cs,
            dc,
            rst,
            busy,
            delay,
            config,
            framebuffer: Framebuffer::new(),
            phase: Phase::Uninitialized,
            power_on: false,
            partial_mode: false,
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn is_hibernating(&self) -> bool {
        self.phase == Phase::Hibernating
    }

    pub fn is_partial_mode(&self) -> bool {
        self.partial_mode
    }

    pub fn is_powered(&self) -> bool {
        self.power_on
    }

    async fn send(&mut self, command: u8, data: &[u8]) -> Result<(), PanelError> {
        self.dc.set_low().map_err(|_| PanelError::Pin)?;
        self.spi.write(&[command]).await.map_err(|_| PanelError::Spi)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(|_| PanelError::Pin)?;
            self.spi.write(data).await.map_err(|_| PanelError::Spi)?;
        }
        self.spi.flush().await.map_err(|_| PanelError::Spi)
    }

    /// Write a command and its data in one chip select
    async fn write_reg(&mut self, command: u8, data: &[u8]) -> Result<(), PanelError> {
        self.cs.set_low().map_err(|_| PanelError::Pin)?;
        let result = self.send(command, data).await;
        let released = self.cs.set_high().map_err(|_| PanelError::Pin);
        result.and(released)
    }

    async fn send_plane(&mut self, command: u8, window: Window) -> Result<(), PanelError> {
        self.dc.set_low().map_err(|_| PanelError::Pin)?;
        self.spi.write(&[command]).await.map_err(|_| PanelError::Spi)?;
        self.dc.set_high().map_err(|_| PanelError::Pin)?;

        for y in window.y0..window.y1 {
            let span = self.framebuffer.row_span(y, window.x0, window.x1);
            self.spi.write(span).await.map_err(|_| PanelError::Spi)?;
        }
        self.spi.flush().await.map_err(|_| PanelError::Spi)
    }

    /// Stream a framebuffer window into a data plane
    async fn write_plane(&mut self, command: u8, window: Window) -> Result<(), PanelError> {
        self.cs.set_low().map_err(|_| PanelError::Pin)?;
        let result = self.send_plane(command, window).await;
        let released = self.cs.set_high().map_err(|_| PanelError::Pin);
        result.and(released)
    }

    async fn run_program(&mut self, program: &[u8]) -> Result<(), PanelError> {
        let mut i = 0;
        while i + 1 < program.len() {
            let command = program[i];
            let len = program[i + 1] as usize;
            let data = program.get(i + 2..i + 2 + len).unwrap_or(&[]);
            self.write_reg(command, data).await?;
            i += 2 + len;
        }
        Ok(())
    }

    /// Wait until BUSY is released, polling every millisecond
    pub async fn busy_wait(&mut self) -> Result<(), PanelError> {
        let mut waited: u32 = 0;
        while self.busy.is_low().map_err(|_| PanelError::Pin)? {
            if let BusyTimeout::Millis(limit) = self.config.busy_timeout {
                if waited >= limit {
                    warn!("panel busy for more than {} ms", limit);
                    return Err(PanelError::BusyTimeout);
                }
            }
            self.delay.delay_ms(1).await;
            waited = waited.saturating_add(1);
        }
        Ok(())
    }

    /// Hardware reset, leaves the controller powered off in full mode
    pub async fn reset(&mut self) -> Result<(), PanelError> {
        self.rst.set_low().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(RESET_PULSE_MS).await;
        self.rst.set_high().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(RESET_PULSE_MS).await;
        self.power_on = false;
        self.partial_mode = false;
        self.busy_wait().await
    }

    async fn set_power(&mut self, on: bool) -> Result<(), PanelError> {
        if self.power_on == on {
            return Ok(());
        }
        let command = if on { cmd::POWER_ON } else { cmd::POWER_OFF };
        self.write_reg(command, &[]).await?;
        self.delay.delay_ms(POWER_DELAY_MS).await;
        self.busy_wait().await?;
        self.power_on = on;
        Ok(())
    }

    /// Switch the panel supplies on, no-op if already on
    pub async fn power_on(&mut self) -> Result<(), PanelError> {
        self.set_power(true).await
    }

    /// Switch the panel supplies off, no-op if already off
    pub async fn power_off(&mut self) -> Result<(), PanelError> {
        self.set_power(false).await
    }

    /// Base registers and full-refresh waveforms
    pub async fn init_full(&mut self) -> Result<(), PanelError> {
        self.run_program(INIT_PROG).await?;
        self.write_reg(cmd::LUT_WHITE, &LUT_W_FULL).await?;
        self.write_reg(cmd::LUT_BLACK, &LUT_B_FULL).await?;
        self.partial_mode = false;
        Ok(())
    }

    /// Base registers, partial program and partial-refresh waveforms
    pub async fn init_partial(&mut self) -> Result<(), PanelError> {
        self.run_program(INIT_PROG).await?;
        self.run_program(PART_INIT_PROG).await?;
        self.write_reg(cmd::LUT_WHITE, &LUT_W_PARTIAL).await?;
        self.write_reg(cmd::LUT_BLACK, &LUT_B_PARTIAL).await?;
        self.partial_mode = true;
        Ok(())
    }

    /// Program the partial refresh window
    pub async fn set_area(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), PanelError> {
        self.write_reg(cmd::PARTIAL_WINDOW, &window_bounds(x, y, w, h))
            .await
    }

    fn ensure_awake(&self) -> Result<(), PanelError> {
        match self.phase {
            Phase::Uninitialized => Err(PanelError::NotInitialized),
            Phase::Hibernating => Err(PanelError::Hibernating),
            Phase::Awake => Ok(()),
        }
    }

    async fn full_refresh(&mut self) -> Result<(), PanelError> {
        self.write_plane(cmd::DATA_OLD, Window::FULL).await?;
        self.write_plane(cmd::DATA_NEW, Window::FULL).await?;
        self.write_reg(cmd::REFRESH, &[]).await?;
        self.busy_wait().await
    }

    /// Push the framebuffer to the panel
    ///
    /// In full mode the whole panel is refreshed whatever `area` is. In
    /// partial mode only `area` is, clipped to the panel; an area entirely
    /// off the panel does nothing.
    pub async fn refresh(&mut self, area: Rect) -> Result<(), PanelError> {
        self.ensure_awake()?;

        if !self.partial_mode {
            self.power_on().await?;
            return self.full_refresh().await;
        }

        let Some(window) = Window::from_area(area) else {
            return Ok(());
        };
        trace!(
            "partial refresh x {}..{} y {}..{}",
            window.x0,
            window.x1,
            window.y0,
            window.y1
        );

        self.power_on().await?;
        self.busy_wait().await?;
        self.write_reg(cmd::PARTIAL_IN, &[]).await?;
        self.set_area(
            window.x0,
            window.y0,
            window.x1 - window.x0,
            window.y1 - window.y0,
        )
        .await?;
        self.write_plane(cmd::DATA_NEW, window).await?;
        self.write_reg(cmd::REFRESH, &[]).await?;
        self.busy_wait().await?;
        // Keep the old plane in step for the next partial update
        self.write_plane(cmd::DATA_OLD, window).await?;
        self.write_reg(cmd::PARTIAL_OUT, &[]).await
    }

    /// Power off and enter deep sleep; only [`Il0323::wake`] leaves it
    pub async fn hibernate(&mut self) -> Result<(), PanelError> {
        match self.phase {
            Phase::Uninitialized => return Err(PanelError::NotInitialized),
            Phase::Hibernating => return Ok(()),
            Phase::Awake => {}
        }
        self.power_off().await?;
        self.write_reg(cmd::DEEP_SLEEP, &[DEEP_SLEEP_CHECK]).await?;
        self.phase = Phase::Hibernating;
        debug!("panel hibernating");
        Ok(())
    }

    /// Leave deep sleep: reset and reload the partial program
    pub async fn wake(&mut self) -> Result<(), PanelError> {
        match self.phase {
            Phase::Uninitialized => return Err(PanelError::NotInitialized),
            Phase::Awake => return Ok(()),
            Phase::Hibernating => {}
        }
        self.reset().await?;
        self.init_partial().await?;
        self.phase = Phase::Awake;
        debug!("panel awake");
        Ok(())
    }

    /// Bring the panel up blank, ready for partial updates, then hibernate
    pub async fn init(&mut self) -> Result<(), PanelError> {
        self.reset().await?;
        self.init_full().await?;
        self.busy_wait().await?;
        self.power_on().await?;
        self.phase = Phase::Awake;

        self.framebuffer.fill(WHITE);
        self.full_refresh().await?;

        self.init_partial().await?;
        self.busy_wait().await?;
        self.hibernate().await?;
        info!("panel initialized");
        Ok(())
    }
}

fn font(size: u8) -> &'static MonoFont<'static> {
    if size <= 1 {
        &FONT_6X10
    } else {
        &FONT_10X20
    }
}

impl<SPI, CS, DC, RST, BUSY, D> Canvas for Il0323<SPI, CS, DC, RST, BUSY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    type Error = PanelError;

    fn size(&self) -> (u16, u16) {
        (WIDTH, HEIGHT)
    }

    fn clear(&mut self, area: Rect) {
        self.framebuffer.clear_area(area);
    }

    fn pixel(&mut self, x: i16, y: i16) {
        self.framebuffer.set_pixel(x as i32, y as i32);
    }

    fn hline(&mut self, x: i16, y: i16, len: i16) {
        self.framebuffer.hline(x as i32, y as i32, len as i32);
    }

    fn vline(&mut self, x: i16, y: i16, len: i16) {
        self.framebuffer.vline(x as i32, y as i32, len as i32);
    }

    fn text(&mut self, x: i16, y: i16, text: &str, size: u8) {
        let style = MonoTextStyle::new(font(size), BinaryColor::On);
        let _ = Text::with_baseline(text, Point::new(x as i32, y as i32), style, Baseline::Top)
            .draw(&mut self.framebuffer);
    }

    fn text_size(&self, text: &str, size: u8) -> (u16, u16) {
        let f = font(size);
        let chars = text.chars().count() as u32;
        let advance = f.character_size.width + f.character_spacing;
        ((chars * advance) as u16, f.character_size.height as u16)
    }

    /// Refresh `area`, waking the panel first if it is hibernating
    async fn render_part(&mut self, area: Rect) -> Result<(), PanelError> {
        if self.is_hibernating() {
            self.wake().await?;
        }
        self.refresh(area).await
    }
}
