//! Exit resolution for an open position.
//!
//! Candles strictly after entry are checked in order. Within one candle the
//! triggers are tried as stop-loss, take-profit, session close, holding
//! limit; the stop goes first because the intrabar path is unknown and an
//! adverse fill is assumed.

use chrono::{DateTime, Utc};

use super::candle::Candle;
use super::config::StrategyConfig;
use super::position::OpenPosition;
use super::session::SessionClock;
use super::trade::ExitReason;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitOutcome {
    /// Index into the full candle series of the candle that closed the
    /// position (the final candle for `EndOfData`).
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub reason: ExitReason,
}

pub struct ExitResolver<'a> {
    config: &'a StrategyConfig,
    clock: SessionClock,
}

impl<'a> ExitResolver<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        ExitResolver {
            config,
            clock: config.clock(),
        }
    }

    /// Trigger fired by a single candle, with its fill price.
    pub fn check_candle(&self, position: &OpenPosition, candle: &Candle) -> Option<(ExitReason, f64)> {
        if position.should_stop_loss(candle) {
            return Some((ExitReason::StopLoss, position.stop_loss));
        }
        if position.should_take_profit(candle) {
            return Some((ExitReason::TakeProfit, position.take_profit));
        }
        if self.config.session_trading && self.clock.in_window(candle, &self.config.exit_window) {
            return Some((ExitReason::SessionClose, candle.close));
        }
        if self.config.time_limit_applies()
            && candle.timestamp - position.entry_time > self.config.max_holding()
        {
            return Some((ExitReason::TimeLimit24h, candle.close));
        }
        None
    }

    /// First exit after `entry_index`, or `EndOfData` at the final candle's
    /// close when nothing triggers.
    pub fn resolve(&self, series: &[Candle], position: &OpenPosition, entry_index: usize) -> ExitOutcome {
        for (index, candle) in series.iter().enumerate().skip(entry_index + 1) {
            if let Some((reason, exit_price)) = self.check_candle(position, candle) {
                return ExitOutcome {
                    exit_index: index,
                    exit_time: candle.timestamp,
                    exit_price,
                    reason,
                };
            }
        }

        let exit_index = series.len().saturating_sub(1).max(entry_index);
        let last = &series[exit_index];
        ExitOutcome {
            exit_index,
            exit_time: last.timestamp,
            exit_price: last.close,
            reason: ExitReason::EndOfData,
        }
    }
}
