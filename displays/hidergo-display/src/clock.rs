//! Wall clock for the status display
//!
//! The host sends local time now and then; between updates the clock runs
//! on device uptime.

use core::fmt::Write;

use heapless::String;

/// Text shown for the time until the host has set the clock
pub const UNSET_TIME: &str = "--:--";
/// Text shown for the date until the host has set the clock
pub const UNSET_DATE: &str = "XX/XX";

/// Broken-down civil time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CivilTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilTime {
    /// Split seconds since the Unix epoch
    pub fn from_unix(secs: i64) -> Self {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400);

        // Days to civil date, proleptic Gregorian calendar
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = (yoe + era * 400 + (month <= 2) as i64) as i32;

        Self {
            year,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem % 3600 / 60) as u8,
            second: (rem % 60) as u8,
        }
    }
}

/// Local time anchored to device uptime
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock {
    anchor: Option<(i64, u64)>,
}

impl WallClock {
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Set local time (seconds since the epoch) as of uptime `now_ms`
    ///
    /// `None` unsets the clock.
    pub fn set(&mut self, local_secs: Option<i64>, now_ms: u64) {
        self.anchor = local_secs.map(|secs| (secs, now_ms));
    }

    pub fn is_set(&self) -> bool {
        self.anchor.is_some()
    }

    /// Local time at uptime `now_ms`
    pub fn now(&self, now_ms: u64) -> Option<CivilTime> {
        let (secs, at) = self.anchor?;
        let elapsed = (now_ms.saturating_sub(at) / 1000) as i64;
        Some(CivilTime::from_unix(secs.saturating_add(elapsed)))
    }

    /// `HH:MM`, or `--:--` while unset
    pub fn format_time(&self, now_ms: u64) -> String<8> {
        let mut out = String::new();
        let _ = match self.now(now_ms) {
            Some(t) => write!(out, "{:02}:{:02}", t.hour, t.minute),
            None => out.push_str(UNSET_TIME).map_err(|_| core::fmt::Error),
        };
        out
    }

    /// `DD/MM`, or `XX/XX` while unset
    pub fn format_date(&self, now_ms: u64) -> String<8> {
        let mut out = String::new();
        let _ = match self.now(now_ms) {
            Some(t) => write!(out, "{:02}/{:02}", t.day, t.month),
            None => out.push_str(UNSET_DATE).map_err(|_| core::fmt::Error),
        };
        out
    }
}
