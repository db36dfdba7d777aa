//! Trade-level summary statistics.

use std::collections::BTreeMap;

use super::position::Side;
use super::trade::{ExitReason, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct TradeMetrics {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub total_r: f64,
    pub avg_r: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Largest peak-to-trough fall of cumulative net PnL, in quote units.
    pub max_drawdown: f64,
    pub avg_holding_hours: f64,
    pub fallback_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
}

impl TradeMetrics {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_r = 0.0_f64;
        let mut holding_minutes = 0i64;
        let mut fallback_trades = 0usize;
        let mut long_trades = 0usize;
        let mut exit_reasons = BTreeMap::new();

        for trade in trades {
            let pnl = trade.pnl_quote;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }

            total_r += trade.r_multiple;
            holding_minutes += (trade.exit_time - trade.entry_time).num_minutes();
            if trade.used_fallback {
                fallback_trades += 1;
            }
            if trade.side == Side::Long {
                long_trades += 1;
            }
            *exit_reasons.entry(trade.exit_reason).or_insert(0) += 1;
        }

        let total_trades = trades.len();
        let per_trade = |total: f64| {
            if total_trades > 0 {
                total / total_trades as f64
            } else {
                0.0
            }
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let total_pnl = total_wins - total_losses;

        TradeMetrics {
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate: per_trade(trades_won as f64),
            profit_factor,
            total_pnl,
            avg_pnl: per_trade(total_pnl),
            total_r,
            avg_r: per_trade(total_r),
            avg_win: if trades_won > 0 {
                total_wins / trades_won as f64
            } else {
                0.0
            },
            avg_loss: if trades_lost > 0 {
                total_losses / trades_lost as f64
            } else {
                0.0
            },
            largest_win,
            largest_loss,
            max_drawdown: compute_drawdown(trades),
            avg_holding_hours: per_trade(holding_minutes as f64 / 60.0),
            fallback_trades,
            long_trades,
            short_trades: total_trades - long_trades,
            exit_reasons,
        }
    }

    pub fn exit_count(&self, reason: ExitReason) -> usize {
        self.exit_reasons.get(&reason).copied().unwrap_or(0)
    }
}

fn compute_drawdown(trades: &[Trade]) -> f64 {
    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        equity += trade.pnl_quote;
        peak = peak.max(equity);
        max_dd = max_dd.max(peak - equity);
    }

    max_dd
}
