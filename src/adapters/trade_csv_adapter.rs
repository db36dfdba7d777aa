//! Trade CSV writer.
//!
//! Always emits the full header, so a run without trades still produces a
//! file with every column in place.

use crate::domain::error::OrbtraderError;
use crate::domain::trade::{Trade, TRADE_COLUMNS};
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Default)]
pub struct TradeCsvAdapter;

impl TradeCsvAdapter {
    pub fn new() -> Self {
        TradeCsvAdapter
    }

    fn record(trade: &Trade) -> [String; 13] {
        [
            trade.day_key.format("%Y-%m-%d").to_string(),
            trade.entry_time.to_rfc3339(),
            trade.side.to_string(),
            trade.entry_price.to_string(),
            trade.stop_loss.to_string(),
            trade.take_profit.to_string(),
            trade.exit_time.to_rfc3339(),
            trade.exit_price.to_string(),
            trade.exit_reason.to_string(),
            trade.pnl_quote.to_string(),
            trade.r_multiple.to_string(),
            trade.used_fallback.to_string(),
            trade.mode.clone(),
        ]
    }

    pub fn write_to<W: Write>(&self, trades: &[Trade], writer: W) -> Result<(), OrbtraderError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(TRADE_COLUMNS).map_err(io::Error::from)?;
        for trade in trades {
            wtr.write_record(Self::record(trade)).map_err(io::Error::from)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for TradeCsvAdapter {
    fn write_trades(&self, trades: &[Trade], output_path: &Path) -> Result<(), OrbtraderError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(output_path)?;
        self.write_to(trades, file)
    }
}
