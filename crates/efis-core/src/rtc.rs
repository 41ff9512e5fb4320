//! Wall-clock time for the telemetry timestamp.
//!
//! The RTC chip driver lives outside this crate; [`SoftRtc`] keeps time
//! from the monotonic clock once the host has set it.

use core::fmt;

use crate::clock::Clock;

/// UTC calendar time, second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 of a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(z: i64) -> (i64, u8, u8) {
    let z = z + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl DateTime {
    /// Validated constructor.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year as i64, month)
            && hour < 24
            && minute < 60
            && second < 60;
        valid.then_some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Parses `YYYY-MM-DDThh:mm:ss` with an optional trailing `Z`.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let s = s.strip_suffix('Z').unwrap_or(s);
        let b = s.as_bytes();
        if b.len() != 19
            || b[4] != b'-'
            || b[7] != b'-'
            || !matches!(b[10], b'T' | b't' | b' ')
            || b[13] != b':'
            || b[16] != b':'
        {
            return None;
        }
        Self::new(
            digits(s.get(0..4)?)? as u16,
            digits(s.get(5..7)?)? as u8,
            digits(s.get(8..10)?)? as u8,
            digits(s.get(11..13)?)? as u8,
            digits(s.get(14..16)?)? as u8,
            digits(s.get(17..19)?)? as u8,
        )
    }

    /// Seconds since the Unix epoch.
    pub fn to_unix(&self) -> i64 {
        days_from_civil(self.year as i64, self.month, self.day) * 86_400
            + self.hour as i64 * 3_600
            + self.minute as i64 * 60
            + self.second as i64
    }

    pub fn from_unix(secs: i64) -> Self {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);
        Self {
            year: year.clamp(0, 9999) as u16,
            month,
            day,
            hour: (rem / 3_600) as u8,
            minute: (rem % 3_600 / 60) as u8,
            second: (rem % 60) as u8,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub trait Rtc {
    /// `None` when no valid time is known.
    fn current_time(&mut self) -> Option<DateTime>;

    /// `true` when the new time was accepted.
    fn set_time(&mut self, time: DateTime) -> bool;
}

/// Board without any time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRtc;

impl Rtc for NoRtc {
    fn current_time(&mut self) -> Option<DateTime> {
        None
    }

    fn set_time(&mut self, _time: DateTime) -> bool {
        false
    }
}

/// Wall time derived from a monotonic clock and the last host set-time.
pub struct SoftRtc<C> {
    clock: C,
    /// (unix seconds, clock ms) at the last set
    anchor: Option<(i64, u64)>,
}

impl<C: Clock> SoftRtc<C> {
    pub const fn new(clock: C) -> Self {
        Self { clock, anchor: None }
    }
}

impl<C: Clock> Rtc for SoftRtc<C> {
    fn current_time(&mut self) -> Option<DateTime> {
        let (secs, at_ms) = self.anchor?;
        let elapsed = (self.clock.elapsed_since(at_ms) / 1_000) as i64;
        Some(DateTime::from_unix(secs + elapsed))
    }

    fn set_time(&mut self, time: DateTime) -> bool {
        self.anchor = Some((time.to_unix(), self.clock.now_ms()));
        efis_info!("rtc set to {}", time);
        true
    }
}
