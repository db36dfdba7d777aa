//! Session clock: local-time conversion and window membership.
//!
//! Windows are expressed in whole local hours, half-open `[start, end)`.
//! `end_hour` may be 24 to mean "through the end of the day", so the
//! full-day entry window `1-24` covers hours 1 through 23 and leaves hour 0
//! to the opening range. A window with `start > end` wraps across midnight,
//! which is only honoured when full-day trading is enabled.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use super::candle::Candle;

pub const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SessionWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        SessionWindow {
            start_hour,
            end_hour,
        }
    }

    pub fn wraps(&self) -> bool {
        self.start_hour > self.end_hour
    }

    /// Whether `hour` (0-23) falls inside the window.
    ///
    /// A wrapping window contains nothing unless `allow_wrap` is set.
    pub fn contains_hour(&self, hour: u32, allow_wrap: bool) -> bool {
        if self.wraps() {
            allow_wrap && (hour >= self.start_hour || hour < self.end_hour)
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }

    /// Hours (0-23) covered by the window.
    pub fn hours(&self, allow_wrap: bool) -> impl Iterator<Item = u32> + '_ {
        (0..HOURS_PER_DAY).filter(move |&h| self.contains_hour(h, allow_wrap))
    }
}

impl fmt::Display for SessionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_hour, self.end_hour)
    }
}

impl FromStr for SessionWindow {
    type Err = String;

    /// Parse `"start-end"`, e.g. `"1-24"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected start-end, got '{s}'"))?;
        let start_hour = start
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid start hour '{}'", start.trim()))?;
        let end_hour = end
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid end hour '{}'", end.trim()))?;
        Ok(SessionWindow::new(start_hour, end_hour))
    }
}

/// UTC instant at which local calendar `date` begins in `tz`.
///
/// When a DST jump skips local midnight, the day begins at the jump.
pub fn local_day_start(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        None => {
            let offset = tz.offset_from_utc_datetime(&midnight).fix();
            midnight.and_utc() - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
        }
    }
}

/// Converts instants into the session's local zone and classifies candles.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    tz: Tz,
    full_day_trading: bool,
}

impl SessionClock {
    pub fn new(tz: Tz, full_day_trading: bool) -> Self {
        SessionClock {
            tz,
            full_day_trading,
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn local(&self, ts: DateTime<Utc>) -> DateTime<Tz> {
        ts.with_timezone(&self.tz)
    }

    /// Local calendar date a candle belongs to.
    pub fn day_key(&self, candle: &Candle) -> NaiveDate {
        self.local(candle.timestamp).date_naive()
    }

    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        local_day_start(self.tz, date)
    }

    pub fn local_hour(&self, candle: &Candle) -> u32 {
        self.local(candle.timestamp).hour()
    }

    pub fn in_window(&self, candle: &Candle, window: &SessionWindow) -> bool {
        window.contains_hour(self.local_hour(candle), self.full_day_trading)
    }
}
