//! Trading costs and R-multiple arithmetic.
//!
//! Commission and slippage are charged per leg at half of each configured
//! rate on that leg's notional, so a round trip pays the full rates once on
//! the average notional.

use super::position::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            commission_rate: 0.0,
            slippage_rate: 0.0,
        }
    }
}

/// Gross and net PnL of one round trip, in quote currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlBreakdown {
    pub gross: f64,
    pub costs: f64,
    pub net: f64,
}

/// (exit - entry) * size for long, (entry - exit) * size for short.
pub fn gross_pnl(side: Side, entry_price: f64, exit_price: f64, size: f64) -> f64 {
    match side {
        Side::Long => (exit_price - entry_price) * size,
        Side::Short => (entry_price - exit_price) * size,
    }
}

/// Net PnL divided by quote risk; 0.0 when there is no risk to normalise by.
pub fn r_multiple(net_pnl: f64, risk_in_quote: f64) -> f64 {
    if risk_in_quote > 0.0 {
        net_pnl / risk_in_quote
    } else {
        0.0
    }
}

/// |entry - stop| * size
pub fn risk_in_quote(entry_price: f64, stop_loss: f64, size: f64) -> f64 {
    (entry_price - stop_loss).abs() * size
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        CostModel {
            commission_rate,
            slippage_rate,
        }
    }

    /// commission_rate / 2 + slippage_rate / 2
    pub fn per_leg_rate(&self) -> f64 {
        self.commission_rate / 2.0 + self.slippage_rate / 2.0
    }

    /// (entry * size + exit * size) * per_leg_rate
    pub fn round_trip_cost(&self, entry_price: f64, exit_price: f64, size: f64) -> f64 {
        (entry_price * size + exit_price * size) * self.per_leg_rate()
    }

    pub fn net_pnl(&self, side: Side, entry_price: f64, exit_price: f64, size: f64) -> PnlBreakdown {
        let gross = gross_pnl(side, entry_price, exit_price, size);
        let costs = self.round_trip_cost(entry_price, exit_price, size);
        PnlBreakdown {
            gross,
            costs,
            net: gross - costs,
        }
    }
}
