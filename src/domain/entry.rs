//! Breakout entry detection and position sizing.
//!
//! Candidates are candles of the entry window, given as indices into the
//! symbol's full candle series. A close above the opening-range high is a
//! long breakout; a close below the low is a short breakout. When no
//! breakout has occurred by the last-but-one window candle and a trade is
//! forced, the entry is taken at that candle so at least one later candle
//! is left for exit simulation.

use super::candle::Candle;
use super::config::StrategyConfig;
use super::position::{OpenPosition, Side};
use super::range::{compute_atr, OrbLevels};
use super::trend::DailyTrend;

/// Where and how to enter, before sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    /// Index into the full candle series.
    pub index: usize,
    pub side: Side,
    pub entry_price: f64,
    pub used_fallback: bool,
}

/// Stop distance collapsed to zero or produced non-positive levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateRisk {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

pub struct EntryDetector<'a> {
    config: &'a StrategyConfig,
    orb: OrbLevels,
    trend: DailyTrend,
}

impl<'a> EntryDetector<'a> {
    pub fn new(config: &'a StrategyConfig, orb: OrbLevels, trend: DailyTrend) -> Self {
        EntryDetector { config, orb, trend }
    }

    pub fn orb(&self) -> OrbLevels {
        self.orb
    }

    pub fn trend(&self) -> DailyTrend {
        self.trend
    }

    /// Breakout direction of a single candle, ignoring filters.
    pub fn breakout_side(&self, candle: &Candle) -> Option<Side> {
        if candle.close > self.orb.high {
            Some(Side::Long)
        } else if candle.close < self.orb.low {
            Some(Side::Short)
        } else {
            None
        }
    }

    /// First candidate whose breakout passes the trend filter and is not on
    /// the `excluded` side.
    pub fn find_breakout(
        &self,
        series: &[Candle],
        candidates: &[usize],
        excluded: Option<Side>,
    ) -> Option<EntrySignal> {
        let filter = self.config.trend_filter();
        candidates.iter().find_map(|&index| {
            let candle = &series[index];
            let side = self.breakout_side(candle)?;
            if Some(side) == excluded || !filter.permits(self.trend, side) {
                return None;
            }
            Some(EntrySignal {
                index,
                side,
                entry_price: candle.close,
                used_fallback: false,
            })
        })
    }

    /// Forced entry at the last-but-one window candle.
    ///
    /// Direction follows the daily trend when it has one, otherwise the
    /// candle's own body. Needs at least two window candles.
    pub fn fallback(&self, series: &[Candle], window: &[usize]) -> Option<EntrySignal> {
        if window.len() < 2 {
            return None;
        }
        let index = window[window.len() - 2];
        let candle = &series[index];
        let side = self.trend.side().unwrap_or(if candle.is_bullish() {
            Side::Long
        } else {
            Side::Short
        });
        Some(EntrySignal {
            index,
            side,
            entry_price: candle.close,
            used_fallback: true,
        })
    }

    /// Scan `window[from..]` for an entry.
    ///
    /// With `allow_fallback`, the scan stops before the window's final
    /// candle and falls back when nothing qualified.
    pub fn detect(
        &self,
        series: &[Candle],
        window: &[usize],
        from: usize,
        excluded: Option<Side>,
        allow_fallback: bool,
    ) -> Option<EntrySignal> {
        if from >= window.len() {
            return None;
        }

        if allow_fallback && window.len() >= 2 {
            let last_tradable = window.len() - 2;
            if from > last_tradable {
                return self.find_breakout(series, &window[from..], excluded);
            }
            return self
                .find_breakout(series, &window[from..=last_tradable], excluded)
                .or_else(|| self.fallback(series, window));
        }

        self.find_breakout(series, &window[from..], excluded)
    }

    /// Stop distance per unit: the ORB range, or ATR over the candles
    /// before entry when the range is degenerate, floored at the minimum
    /// stop distance; scaled by the ORB multiplier.
    pub fn stop_distance(&self, history: &[Candle]) -> f64 {
        let floor = self.config.min_stop_distance;
        let range = self.orb.range();
        let base = if range > floor {
            range
        } else {
            compute_atr(history, self.config.atr_period).max(floor)
        };
        base * self.config.orb_multiplier
    }

    /// Size the signal into a position risking `risk_per_trade`.
    pub fn open_position(
        &self,
        series: &[Candle],
        signal: &EntrySignal,
    ) -> Result<OpenPosition, DegenerateRisk> {
        let distance = self.stop_distance(&series[..signal.index]);
        let sign = signal.side.sign();
        let stop_loss = signal.entry_price - sign * distance;
        let take_profit = signal.entry_price + sign * distance * self.config.take_profit_multiplier;
        let risk_per_unit = (signal.entry_price - stop_loss).abs();

        let degenerate = !(risk_per_unit.is_finite() && risk_per_unit > 0.0)
            || signal.entry_price <= 0.0
            || stop_loss <= 0.0
            || take_profit <= 0.0;
        if degenerate {
            return Err(DegenerateRisk {
                entry_price: signal.entry_price,
                stop_loss,
                take_profit,
            });
        }

        Ok(OpenPosition {
            entry_time: series[signal.index].timestamp,
            side: signal.side,
            entry_price: signal.entry_price,
            stop_loss,
            take_profit,
            size: self.config.risk_per_trade / risk_per_unit,
            used_fallback: signal.used_fallback,
        })
    }
}
