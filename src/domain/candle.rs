//! OHLCV candle representation.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;

use super::session::local_day_start;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Aggregate intraday candles into one candle per local calendar date.
///
/// Input must be ordered by timestamp. Each daily candle is stamped one day
/// before the local end of its date, so `timestamp + 1 day` is the instant
/// it completes even on DST transition days.
pub fn resample_daily(candles: &[Candle], tz: Tz) -> Vec<Candle> {
    let mut daily: Vec<Candle> = Vec::new();
    let mut current_day: Option<NaiveDate> = None;

    for candle in candles {
        let day = candle.timestamp.with_timezone(&tz).date_naive();
        match daily.last_mut() {
            Some(agg) if current_day == Some(day) => {
                agg.high = agg.high.max(candle.high);
                agg.low = agg.low.min(candle.low);
                agg.close = candle.close;
                agg.volume += candle.volume;
            }
            _ => {
                let end = day
                    .succ_opt()
                    .map(|next| local_day_start(tz, next))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                daily.push(Candle {
                    timestamp: end - TimeDelta::days(1),
                    ..candle.clone()
                });
                current_day = Some(day);
            }
        }
    }

    daily
}
