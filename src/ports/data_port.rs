//! Candle supply.

use crate::domain::candle::Candle;
use crate::domain::error::OrbtraderError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Intraday candles whose UTC date lies in `[start_date, end_date]`,
    /// ordered by timestamp.
    fn fetch_candles(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, OrbtraderError>;

    /// Daily candles for the trend filter. An empty series means the engine
    /// resamples from the intraday candles.
    fn fetch_daily_candles(
        &self,
        _symbol: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<Candle>, OrbtraderError> {
        Ok(Vec::new())
    }

    fn list_symbols(&self) -> Result<Vec<String>, OrbtraderError>;
}
