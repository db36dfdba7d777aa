//! Closed trade records handed to the persistence/report layer.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use super::cost::{self, CostModel};
use super::exit::ExitOutcome;
use super::position::{OpenPosition, Side};
use super::session::SessionClock;

/// Output column order. Downstream consumers depend on both the names and
/// the order, including for days with no trades.
pub const TRADE_COLUMNS: [&str; 13] = [
    "day_key",
    "entry_time",
    "side",
    "entry_price",
    "sl",
    "tp",
    "exit_time",
    "exit_price",
    "exit_reason",
    "pnl_usdt",
    "r_multiple",
    "used_fallback",
    "mode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SessionClose,
    TimeLimit24h,
    EndOfData,
}

impl ExitReason {
    pub const ALL: [ExitReason; 5] = [
        ExitReason::StopLoss,
        ExitReason::TakeProfit,
        ExitReason::SessionClose,
        ExitReason::TimeLimit24h,
        ExitReason::EndOfData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::SessionClose => "session_close",
            ExitReason::TimeLimit24h => "time_limit_24h",
            ExitReason::EndOfData => "end_of_data",
        }
    }

    /// `EndOfData` marks a position still open when the series ran out.
    pub fn is_closed(&self) -> bool {
        !matches!(self, ExitReason::EndOfData)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub day_key: NaiveDate,
    pub entry_time: DateTime<Tz>,
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub exit_time: DateTime<Tz>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Net of commission and slippage.
    pub pnl_quote: f64,
    pub r_multiple: f64,
    pub used_fallback: bool,
    pub mode: String,
    pub size: f64,
}

impl Trade {
    /// Build the record for a position resolved by `exit`.
    pub fn close(
        day_key: NaiveDate,
        position: &OpenPosition,
        exit: &ExitOutcome,
        costs: &CostModel,
        clock: &SessionClock,
        mode: &str,
    ) -> Self {
        let pnl = costs.net_pnl(
            position.side,
            position.entry_price,
            exit.exit_price,
            position.size,
        );
        let risk = cost::risk_in_quote(position.entry_price, position.stop_loss, position.size);

        Trade {
            day_key,
            entry_time: clock.local(position.entry_time),
            side: position.side,
            entry_price: position.entry_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            exit_time: clock.local(exit.exit_time),
            exit_price: exit.exit_price,
            exit_reason: exit.reason,
            pnl_quote: pnl.net,
            r_multiple: cost::r_multiple(pnl.net, risk),
            used_fallback: position.used_fallback,
            mode: mode.to_string(),
            size: position.size,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl_quote > 0.0
    }
}
