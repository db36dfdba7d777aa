//! CSV candle reader.
//!
//! Intraday candles live in `{SYMBOL}.csv` and optional daily candles in
//! `{SYMBOL}_1d.csv` under one directory. Columns:
//! `timestamp,open,high,low,close,volume`, where `timestamp` is RFC 3339 or
//! Unix milliseconds.

use crate::domain::candle::Candle;
use crate::domain::error::OrbtraderError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const DAILY_SUFFIX: &str = "_1d.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn intraday_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn daily_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}{DAILY_SUFFIX}"))
    }
}

fn data_error(reason: impl Into<String>) -> OrbtraderError {
    OrbtraderError::Data {
        reason: reason.into(),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, OrbtraderError> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| data_error(format!("timestamp out of range: {raw}")));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| data_error(format!("invalid timestamp {raw:?}: {e}")))
}

fn price(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, OrbtraderError> {
    let raw = record
        .get(index)
        .ok_or_else(|| data_error(format!("missing {name} column")))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| data_error(format!("invalid {name} value {raw:?}: {e}")))?;
    if !value.is_finite() {
        return Err(data_error(format!("non-finite {name} value")));
    }
    Ok(value)
}

/// Read candles from `path` whose UTC date lies in `[start_date, end_date]`.
fn read_candles(path: &Path, start_date: NaiveDate, end_date: NaiveDate) -> Result<Vec<Candle>, OrbtraderError> {
    let content = fs::read_to_string(path)
        .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| data_error(format!("CSV parse error: {e}")))?;

        let raw_ts = record
            .get(0)
            .ok_or_else(|| data_error("missing timestamp column"))?;
        let timestamp = parse_timestamp(raw_ts.trim())?;

        let date = timestamp.date_naive();
        if date < start_date || date > end_date {
            continue;
        }

        let candle = Candle {
            timestamp,
            open: price(&record, 1, "open")?,
            high: price(&record, 2, "high")?,
            low: price(&record, 3, "low")?,
            close: price(&record, 4, "close")?,
            volume: price(&record, 5, "volume")?,
        };
        if candle.high < candle.low {
            return Err(data_error(format!("high below low at {raw_ts}")));
        }
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

impl DataPort for CsvAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, OrbtraderError> {
        read_candles(&self.intraday_path(symbol), start_date, end_date)
    }

    /// Missing daily file is not an error; the engine resamples instead.
    fn fetch_daily_candles(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, OrbtraderError> {
        let path = self.daily_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_candles(&path, start_date, end_date)
    }

    fn list_symbols(&self) -> Result<Vec<String>, OrbtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {e}")))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if name_str.ends_with(DAILY_SUFFIX) {
                continue;
            }
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
