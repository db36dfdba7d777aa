//! Daily directional bias from higher-timeframe candles.

use std::fmt;

use chrono::{NaiveDate, TimeDelta};

use super::candle::Candle;
use super::position::Side;
use super::session::SessionClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyTrend {
    Long,
    Short,
    Neutral,
}

impl DailyTrend {
    pub fn side(&self) -> Option<Side> {
        match self {
            DailyTrend::Long => Some(Side::Long),
            DailyTrend::Short => Some(Side::Short),
            DailyTrend::Neutral => None,
        }
    }
}

impl fmt::Display for DailyTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DailyTrend::Long => "long",
            DailyTrend::Short => "short",
            DailyTrend::Neutral => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFilter {
    pub enabled: bool,
    pub ma_period: usize,
    /// Minimum relative distance of close from the average, e.g. 0.01 = 1%.
    pub min_strength: f64,
}

impl TrendFilter {
    /// Compare the last daily close completed before `date` begins locally
    /// with the mean of up to `ma_period` closes preceding it.
    ///
    /// A daily candle covers the 24 hours from its timestamp, so a candle
    /// stamped 00:00 UTC is only complete at the next UTC midnight. Fewer
    /// than two completed candles yields `Neutral`.
    pub fn compute_daily_trend(
        &self,
        daily: &[Candle],
        date: NaiveDate,
        clock: &SessionClock,
    ) -> DailyTrend {
        let session_start = clock.day_start(date);
        let completed = daily.partition_point(|c| c.timestamp + TimeDelta::days(1) <= session_start);
        if completed < 2 || self.ma_period == 0 {
            return DailyTrend::Neutral;
        }

        let latest = &daily[completed - 1];
        let prior_start = (completed - 1).saturating_sub(self.ma_period);
        let prior = &daily[prior_start..completed - 1];
        let average = prior.iter().map(|c| c.close).sum::<f64>() / prior.len() as f64;
        if average <= 0.0 {
            return DailyTrend::Neutral;
        }

        let strength = (latest.close - average) / average;
        if strength > self.min_strength {
            DailyTrend::Long
        } else if strength < -self.min_strength {
            DailyTrend::Short
        } else {
            DailyTrend::Neutral
        }
    }

    /// Whether a breakout on `side` may be taken given the day's trend.
    pub fn permits(&self, trend: DailyTrend, side: Side) -> bool {
        !self.enabled || trend.side() == Some(side)
    }
}
