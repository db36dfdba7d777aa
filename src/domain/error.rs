//! Domain error types.
//!
//! Only configuration and I/O problems are errors. Per-day anomalies (no ORB
//! candles, degenerate stop distance, unresolved exits) are reported through
//! [`crate::domain::backtest::DayStatus`] and never abort a run.

use crate::domain::universe::UniverseError;

/// Top-level error type for orbtrader.
#[derive(Debug, thiserror::Error)]
pub enum OrbtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no candles for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OrbtraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        OrbtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        OrbtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&OrbtraderError> for std::process::ExitCode {
    fn from(err: &OrbtraderError) -> Self {
        let code: u8 = match err {
            OrbtraderError::Io(_) => 1,
            OrbtraderError::ConfigParse { .. }
            | OrbtraderError::ConfigMissing { .. }
            | OrbtraderError::ConfigInvalid { .. }
            | OrbtraderError::Universe(_) => 2,
            OrbtraderError::Data { .. } => 3,
            OrbtraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
