//! Multi-day backtest driver.
//!
//! Splits a symbol's candle series into local calendar days, runs the
//! [`TradeManager`] over each day in order and collects closed trades,
//! still-open positions and a per-day log. Symbols are independent and can
//! be run in parallel with [`run_symbols`].

use std::borrow::Cow;
use std::ops::Range;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::candle::{resample_daily, Candle};
use super::config::StrategyConfig;
use super::error::OrbtraderError;
use super::manager::{DayOutcome, TradeManager};
use super::metrics::TradeMetrics;
use super::position::OpenPosition;
use super::session::SessionClock;
use super::trade::Trade;
use super::trend::DailyTrend;
use super::universe::SymbolCandles;

pub use super::manager::DayStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktestRequest {
    pub symbol: String,
    /// Label copied onto every trade record.
    pub mode: String,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyLogEntry {
    pub day_key: NaiveDate,
    pub status: DayStatus,
    pub trend: DailyTrend,
    /// Closed trades plus an unresolved position, if any.
    pub trades: usize,
    pub pnl_quote: f64,
    pub r_total: f64,
}

impl DailyLogEntry {
    fn from_outcome(outcome: &DayOutcome) -> Self {
        DailyLogEntry {
            day_key: outcome.day_key,
            status: outcome.status,
            trend: outcome.trend,
            trades: outcome.trade_count(),
            pnl_quote: outcome.trades.iter().map(|t| t.pnl_quote).sum(),
            r_total: outcome.trades.iter().map(|t| t.r_multiple).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    /// Closed trades in entry order.
    pub trades: Vec<Trade>,
    /// Positions the series ended on, marked `end_of_data`.
    pub active: Vec<Trade>,
    pub daily_log: Vec<DailyLogEntry>,
}

impl BacktestResult {
    pub fn metrics(&self) -> TradeMetrics {
        TradeMetrics::compute(&self.trades)
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl_quote).sum()
    }

    pub fn trades_on(&self, day: NaiveDate) -> impl Iterator<Item = &Trade> + '_ {
        self.trades.iter().filter(move |t| t.day_key == day)
    }

    pub fn days_with(&self, status: DayStatus) -> usize {
        self.daily_log.iter().filter(|d| d.status == status).count()
    }
}

/// Index ranges of consecutive candles sharing a local calendar date.
fn day_ranges(series: &[Candle], clock: &SessionClock) -> Vec<(NaiveDate, Range<usize>)> {
    let mut days: Vec<(NaiveDate, Range<usize>)> = Vec::new();
    for (index, candle) in series.iter().enumerate() {
        let key = clock.day_key(candle);
        match days.last_mut() {
            Some((last, range)) if *last == key => range.end = index + 1,
            _ => days.push((key, index..index + 1)),
        }
    }
    days
}

/// Candles sorted by timestamp, keeping the first of any duplicates.
fn ordered(candles: &[Candle]) -> Cow<'_, [Candle]> {
    let sorted = candles.is_sorted_by_key(|c| c.timestamp);
    if sorted && candles.windows(2).all(|w| w[0].timestamp != w[1].timestamp) {
        return Cow::Borrowed(candles);
    }

    let mut fixed = candles.to_vec();
    if !sorted {
        warn!("candles out of order, sorting by timestamp");
        fixed.sort_by_key(|c| c.timestamp);
    }
    let before = fixed.len();
    fixed.dedup_by_key(|c| c.timestamp);
    if fixed.len() < before {
        warn!(dropped = before - fixed.len(), "duplicate candle timestamps, keeping the first");
    }
    Cow::Owned(fixed)
}

/// Run every day of `series` whose key satisfies `in_range`.
fn simulate_days(
    series: &[Candle],
    daily: &[Candle],
    config: &StrategyConfig,
    mode: &str,
    in_range: impl Fn(NaiveDate) -> bool,
) -> Vec<DayOutcome> {
    let clock = config.clock();
    let filter = config.trend_filter();

    let resampled;
    let daily = if filter.enabled && daily.is_empty() {
        resampled = resample_daily(series, clock.tz());
        resampled.as_slice()
    } else {
        daily
    };

    let manager = TradeManager::new(config, mode);
    day_ranges(series, &clock)
        .into_iter()
        .filter(|(day, _)| in_range(*day))
        .map(|(day, range)| {
            let trend = if filter.enabled {
                filter.compute_daily_trend(daily, day, &clock)
            } else {
                DailyTrend::Neutral
            };
            manager.run_day(series, range, day, trend)
        })
        .collect()
}

/// Backtest one symbol over the request's date range.
///
/// The configuration is validated before any day runs. Per-day anomalies
/// are recorded in the daily log and never fail the run. Exits may resolve
/// on candles after `end_date`.
pub fn run_backtest(
    candles: &[Candle],
    daily: &[Candle],
    config: &StrategyConfig,
    request: &BacktestRequest,
) -> Result<BacktestResult, OrbtraderError> {
    config.validate()?;
    if request.start_date > request.end_date {
        return Err(OrbtraderError::invalid(
            "backtest",
            "end_date",
            format!("{} is before start_date {}", request.end_date, request.start_date),
        ));
    }

    let series = ordered(candles);
    let daily = ordered(daily);
    let outcomes = simulate_days(&series, &daily, config, &request.mode, |day| {
        day >= request.start_date && day <= request.end_date
    });

    let mut result = BacktestResult {
        symbol: request.symbol.clone(),
        trades: Vec::new(),
        active: Vec::new(),
        daily_log: Vec::with_capacity(outcomes.len()),
    };
    for outcome in outcomes {
        result.daily_log.push(DailyLogEntry::from_outcome(&outcome));
        result.trades.extend(outcome.trades);
        result.active.extend(outcome.active);
    }

    info!(
        symbol = %result.symbol,
        days = result.daily_log.len(),
        trades = result.trades.len(),
        active = result.active.len(),
        pnl = result.total_pnl(),
        "backtest complete"
    );
    Ok(result)
}

/// Backtest independent symbols in parallel. Results keep input order.
pub fn run_symbols(
    symbols: &[SymbolCandles],
    config: &StrategyConfig,
    mode: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<BacktestResult>, OrbtraderError> {
    config.validate()?;
    symbols
        .par_iter()
        .map(|sc| {
            let request = BacktestRequest {
                symbol: sc.symbol.clone(),
                mode: mode.to_string(),
                start_date,
                end_date,
            };
            run_backtest(&sc.candles, &sc.daily, config, &request)
        })
        .collect::<Result<Vec<_>, _>>()
}

/// Position the strategy would be holding at the end of `candles`, if any.
///
/// Replays every day in the series; callers own any caching.
pub fn detect_or_update_active_trade(candles: &[Candle], config: &StrategyConfig) -> Option<OpenPosition> {
    if let Err(err) = config.validate() {
        warn!(%err, "cannot detect active trade");
        return None;
    }
    let series = ordered(candles);
    let outcomes = simulate_days(&series, &[], config, config.default_mode(), |_| true);
    let active = outcomes.into_iter().rev().find_map(|o| o.open_position);
    debug!(found = active.is_some(), "active trade detection");
    active
}
