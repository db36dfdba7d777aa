//! Trade sink.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::OrbtraderError;
use crate::domain::trade::Trade;
use std::path::Path;

/// Port for persisting closed trades.
pub trait ReportPort {
    fn write_trades(&self, trades: &[Trade], output_path: &Path) -> Result<(), OrbtraderError>;

    /// Default implementation: writes the closed trades only, leaving
    /// unresolved positions out.
    fn write_result(&self, result: &BacktestResult, output_path: &Path) -> Result<(), OrbtraderError> {
        self.write_trades(&result.trades, output_path)
    }
}
