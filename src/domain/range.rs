//! Opening-range levels and average true range.

use super::candle::Candle;
use super::session::{SessionClock, SessionWindow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbLevels {
    pub high: f64,
    pub low: f64,
}

impl OrbLevels {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// High/low of the candles inside `orb_window`.
///
/// Returns `None` when no candle falls in the window; the caller skips the
/// day rather than treating it as an error.
pub fn compute_orb(
    candles: &[Candle],
    clock: &SessionClock,
    orb_window: &SessionWindow,
) -> Option<OrbLevels> {
    candles
        .iter()
        .filter(|c| clock.in_window(c, orb_window))
        .fold(None, |acc: Option<OrbLevels>, c| match acc {
            None => Some(OrbLevels {
                high: c.high,
                low: c.low,
            }),
            Some(levels) => Some(OrbLevels {
                high: levels.high.max(c.high),
                low: levels.low.min(c.low),
            }),
        })
}

/// Average true range over the last `lookback` candles of `candles`.
///
/// Uses however many candles are available when there are fewer than
/// `lookback`; returns 0.0 for an empty slice or a zero lookback. The first
/// candle of the slice has no previous close, so its range is `high - low`.
pub fn compute_atr(candles: &[Candle], lookback: usize) -> f64 {
    if candles.is_empty() || lookback == 0 {
        return 0.0;
    }

    let start = candles.len().saturating_sub(lookback);
    let total: f64 = (start..candles.len())
        .map(|i| {
            let candle = &candles[i];
            if i == 0 {
                candle.high - candle.low
            } else {
                candle.true_range(candles[i - 1].close)
            }
        })
        .sum();

    total / (candles.len() - start) as f64
}
