#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use orbtrader::domain::candle::Candle;
use orbtrader::domain::config::StrategyConfig;
use orbtrader::domain::error::OrbtraderError;
use orbtrader::domain::session::SessionWindow;
use orbtrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::process::ExitCode;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub daily: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            daily: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_daily(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.daily.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

fn in_range(candles: &[Candle], start: NaiveDate, end: NaiveDate) -> Vec<Candle> {
    candles
        .iter()
        .filter(|c| {
            let d = c.timestamp.date_naive();
            d >= start && d <= end
        })
        .cloned()
        .collect()
}

impl DataPort for MockDataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, OrbtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(OrbtraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|c| in_range(c, start_date, end_date))
            .unwrap_or_default())
    }

    fn fetch_daily_candles(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, OrbtraderError> {
        Ok(self
            .daily
            .get(symbol)
            .map(|c| in_range(c, start_date, end_date))
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, OrbtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn make_candle(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp,
        open,
        high,
        low,
        close,
        volume: 1.0,
    }
}

/// One hourly candle per close starting at `start`, with a one-unit wick
/// either side of the body.
pub fn hourly_candles(start: DateTime<Utc>, closes: &[f64]) -> Vec<Candle> {
    let mut prev = closes.first().copied().unwrap_or(0.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            make_candle(
                start + Duration::hours(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
            )
        })
        .collect()
}

/// UTC session: ORB 00-01, entries 01-20, forced close 20-24.
pub fn session_config() -> StrategyConfig {
    StrategyConfig {
        risk_per_trade: 100.0,
        orb_multiplier: 1.0,
        take_profit_multiplier: 2.0,
        orb_window: SessionWindow::new(0, 1),
        entry_window: SessionWindow::new(1, 20),
        exit_window: SessionWindow::new(20, 24),
        full_day_trading: false,
        session_trading: true,
        ..Default::default()
    }
}

/// Round-the-clock trading with the 24h holding limit.
pub fn full_day_config() -> StrategyConfig {
    StrategyConfig {
        risk_per_trade: 100.0,
        ..Default::default()
    }
}

pub fn exit_code_is(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}
