//! Per-day trade state machine.
//!
//! `Idle → Searching → InPosition → Closed`, looping back to `Searching`
//! after a closed trade when re-entry on trend change is enabled and the
//! daily cap has room. A re-entry must break out on the side opposite to
//! the previous trade. Nothing carries over between days.

use std::fmt;
use std::ops::Range;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::candle::Candle;
use super::config::StrategyConfig;
use super::cost::CostModel;
use super::entry::EntryDetector;
use super::exit::ExitResolver;
use super::position::{OpenPosition, Side};
use super::range::compute_orb;
use super::session::SessionClock;
use super::trade::Trade;
use super::trend::DailyTrend;

/// How a day ended, for the daily log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayStatus {
    Traded,
    NoOrbCandles,
    NoEntryCandles,
    NoSignal,
    DegenerateRisk,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Traded => "traded",
            DayStatus::NoOrbCandles => "no_orb_candles",
            DayStatus::NoEntryCandles => "no_entry_candles",
            DayStatus::NoSignal => "no_signal",
            DayStatus::DegenerateRisk => "degenerate_risk",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub day_key: NaiveDate,
    pub status: DayStatus,
    pub trend: DailyTrend,
    /// Closed trades in entry order.
    pub trades: Vec<Trade>,
    /// Position still open when the series ended.
    pub active: Option<Trade>,
    pub open_position: Option<OpenPosition>,
}

impl DayOutcome {
    fn skipped(day_key: NaiveDate, status: DayStatus, trend: DailyTrend) -> Self {
        DayOutcome {
            day_key,
            status,
            trend,
            trades: Vec::new(),
            active: None,
            open_position: None,
        }
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len() + usize::from(self.active.is_some())
    }
}

enum DayState {
    Idle,
    Searching { from: usize },
    InPosition { position: OpenPosition, entry_index: usize },
    Closed,
}

pub struct TradeManager<'a> {
    config: &'a StrategyConfig,
    clock: SessionClock,
    costs: CostModel,
    resolver: ExitResolver<'a>,
    mode: String,
}

impl<'a> TradeManager<'a> {
    pub fn new(config: &'a StrategyConfig, mode: impl Into<String>) -> Self {
        TradeManager {
            config,
            clock: config.clock(),
            costs: config.cost_model(),
            resolver: ExitResolver::new(config),
            mode: mode.into(),
        }
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    fn reentry_enabled(&self) -> bool {
        self.config.allow_reentry_on_trend_change && self.config.max_daily_trades > 1
    }

    /// Simulate one local calendar day.
    ///
    /// `day` is the index range of that day's candles in `series`. Exits may
    /// be resolved on candles past the end of the day.
    pub fn run_day(
        &self,
        series: &[Candle],
        day: Range<usize>,
        day_key: NaiveDate,
        trend: DailyTrend,
    ) -> DayOutcome {
        let day_candles = &series[day.clone()];

        let window: Vec<usize> = day
            .clone()
            .filter(|&i| self.clock.in_window(&series[i], &self.config.entry_window))
            .collect();

        let mut trades: Vec<Trade> = Vec::new();
        let mut active: Option<Trade> = None;
        let mut open_position: Option<OpenPosition> = None;
        let mut last_side: Option<Side> = None;
        let mut degenerate = false;

        let mut detector: Option<EntryDetector<'_>> = None;
        let mut state = DayState::Idle;

        loop {
            state = match state {
                DayState::Idle => {
                    let Some(orb) = compute_orb(day_candles, &self.clock, &self.config.orb_window) else {
                        debug!(%day_key, "no candles in opening range, skipping day");
                        return DayOutcome::skipped(day_key, DayStatus::NoOrbCandles, trend);
                    };
                    if window.is_empty() {
                        debug!(%day_key, "no candles in entry window, skipping day");
                        return DayOutcome::skipped(day_key, DayStatus::NoEntryCandles, trend);
                    }
                    debug!(%day_key, orb_high = orb.high, orb_low = orb.low, %trend, "opening range set");
                    detector = Some(EntryDetector::new(self.config, orb, trend));
                    DayState::Searching { from: 0 }
                }

                DayState::Searching { from } => {
                    let Some(detector) = detector.as_ref() else {
                        break;
                    };
                    if trades.len() >= self.config.max_daily_trades {
                        DayState::Closed
                    } else {
                        let allow_fallback = self.config.force_one_trade && trades.is_empty();
                        match detector.detect(series, &window, from, last_side, allow_fallback) {
                            None => DayState::Closed,
                            Some(signal) => match detector.open_position(series, &signal) {
                                Ok(position) => DayState::InPosition {
                                    position,
                                    entry_index: signal.index,
                                },
                                Err(risk) => {
                                    warn!(
                                        %day_key,
                                        entry = risk.entry_price,
                                        stop = risk.stop_loss,
                                        target = risk.take_profit,
                                        "degenerate stop distance, no trade"
                                    );
                                    degenerate = true;
                                    DayState::Closed
                                }
                            },
                        }
                    }
                }

                DayState::InPosition {
                    position,
                    entry_index,
                } => {
                    let exit = self.resolver.resolve(series, &position, entry_index);
                    let trade =
                        Trade::close(day_key, &position, &exit, &self.costs, &self.clock, &self.mode);
                    debug!(
                        %day_key,
                        side = %trade.side,
                        entry = trade.entry_price,
                        exit = trade.exit_price,
                        reason = %trade.exit_reason,
                        pnl = trade.pnl_quote,
                        fallback = trade.used_fallback,
                        "trade resolved"
                    );
                    last_side = Some(position.side);

                    if !exit.reason.is_closed() {
                        active = Some(trade);
                        open_position = Some(position);
                        DayState::Closed
                    } else {
                        trades.push(trade);
                        if self.reentry_enabled() {
                            let from = window.partition_point(|&i| i <= exit.exit_index);
                            DayState::Searching { from }
                        } else {
                            DayState::Closed
                        }
                    }
                }

                DayState::Closed => break,
            };
        }

        let status = if !trades.is_empty() || active.is_some() {
            DayStatus::Traded
        } else if degenerate {
            DayStatus::DegenerateRisk
        } else {
            DayStatus::NoSignal
        };

        DayOutcome {
            day_key,
            status,
            trend,
            trades,
            active,
            open_position,
        }
    }
}
