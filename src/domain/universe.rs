//! Symbol universe for multi-symbol runs.
//!
//! Parses symbol lists from configuration and loads each symbol's candles,
//! skipping symbols that have nothing to simulate.

use crate::domain::candle::Candle;
use crate::domain::error::OrbtraderError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

/// An ORB day needs at least one range candle and one entry candle.
pub const MIN_CANDLES: usize = 2;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("all symbols failed validation")]
    AllSymbolsFailed,
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Candles for one symbol, ready for the engine.
#[derive(Debug, Clone)]
pub struct SymbolCandles {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub daily: Vec<Candle>,
}

#[derive(Debug, Clone)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    InsufficientCandles { candles: usize },
}

#[derive(Debug)]
pub struct UniverseLoad {
    pub loaded: Vec<SymbolCandles>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetch intraday (and, when `with_daily`, daily) candles for every symbol.
///
/// Symbols whose fetch fails or that return fewer than [`MIN_CANDLES`] are
/// skipped with a warning. Fails only if every symbol is skipped.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    with_daily: bool,
) -> Result<UniverseLoad, OrbtraderError> {
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let candles = match data_port.fetch_candles(symbol, start_date, end_date) {
            Ok(c) => c,
            Err(e) => {
                warn!(%symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
                continue;
            }
        };

        if candles.len() < MIN_CANDLES {
            warn!(%symbol, candles = candles.len(), "skipping symbol, not enough candles");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientCandles {
                    candles: candles.len(),
                },
            });
            continue;
        }

        let daily = if with_daily {
            data_port
                .fetch_daily_candles(symbol, start_date, end_date)
                .unwrap_or_else(|e| {
                    warn!(%symbol, error = %e, "daily candles unavailable, will resample");
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        info!(%symbol, candles = candles.len(), daily = daily.len(), "loaded");
        loaded.push(SymbolCandles {
            symbol: symbol.clone(),
            candles,
            daily,
        });
    }

    if loaded.is_empty() {
        return Err(UniverseError::AllSymbolsFailed.into());
    }

    Ok(UniverseLoad { loaded, skipped })
}
