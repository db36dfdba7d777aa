//! Strategy configuration and validation.
//!
//! The configuration is built once per run, validated before any day is
//! simulated, and never mutated afterwards.

use chrono::TimeDelta;
use chrono_tz::Tz;

use crate::domain::cost::CostModel;
use crate::domain::error::OrbtraderError;
use crate::domain::session::{SessionClock, SessionWindow, HOURS_PER_DAY};
use crate::domain::trend::TrendFilter;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Quote-currency amount lost when a stop is hit.
    pub risk_per_trade: f64,
    pub orb_multiplier: f64,
    /// Target distance as a multiple of stop distance.
    pub take_profit_multiplier: f64,
    pub min_trend_strength: f64,
    pub orb_window: SessionWindow,
    pub entry_window: SessionWindow,
    /// Session-close window: candles inside it force an exit when
    /// `session_trading` is on.
    pub exit_window: SessionWindow,
    pub session_timezone: Tz,
    pub full_day_trading: bool,
    pub session_trading: bool,
    pub force_one_trade: bool,
    pub max_daily_trades: usize,
    pub allow_reentry_on_trend_change: bool,
    pub use_daily_trend_filter: bool,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub atr_period: usize,
    pub trend_ma_period: usize,
    /// Stop distance floor when both the ORB range and ATR are degenerate.
    pub min_stop_distance: f64,
    pub max_holding_hours: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            risk_per_trade: 100.0,
            orb_multiplier: 1.0,
            take_profit_multiplier: 2.0,
            min_trend_strength: 0.0,
            orb_window: SessionWindow::new(0, 1),
            entry_window: SessionWindow::new(1, 24),
            exit_window: SessionWindow::new(23, 24),
            session_timezone: chrono_tz::UTC,
            full_day_trading: true,
            session_trading: false,
            force_one_trade: false,
            max_daily_trades: 1,
            allow_reentry_on_trend_change: false,
            use_daily_trend_filter: false,
            commission_rate: 0.0,
            slippage_rate: 0.0,
            atr_period: 14,
            trend_ma_period: 3,
            min_stop_distance: 0.01,
            max_holding_hours: 24,
        }
    }
}

impl StrategyConfig {
    pub fn clock(&self) -> SessionClock {
        SessionClock::new(self.session_timezone, self.full_day_trading)
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.commission_rate, self.slippage_rate)
    }

    pub fn trend_filter(&self) -> TrendFilter {
        TrendFilter {
            enabled: self.use_daily_trend_filter,
            ma_period: self.trend_ma_period,
            min_strength: self.min_trend_strength,
        }
    }

    /// Saturates at `TimeDelta::MAX`; `validate` rejects hours that do not fit.
    pub fn max_holding(&self) -> TimeDelta {
        TimeDelta::try_hours(self.max_holding_hours).unwrap_or(TimeDelta::MAX)
    }

    /// Whether the holding-period limit applies: full-day trading with no
    /// session-close window in force.
    pub fn time_limit_applies(&self) -> bool {
        self.full_day_trading && !self.session_trading
    }

    /// Label recorded on every trade when the caller does not supply one.
    pub fn default_mode(&self) -> &'static str {
        if self.full_day_trading {
            "full_day"
        } else {
            "session"
        }
    }

    pub fn validate(&self) -> Result<(), OrbtraderError> {
        require_positive("strategy", "risk_per_trade", self.risk_per_trade)?;
        require_positive("strategy", "orb_multiplier", self.orb_multiplier)?;
        require_positive("strategy", "take_profit_multiplier", self.take_profit_multiplier)?;
        require_non_negative("strategy", "min_trend_strength", self.min_trend_strength)?;
        require_positive("strategy", "min_stop_distance", self.min_stop_distance)?;

        if self.max_daily_trades < 1 {
            return Err(OrbtraderError::invalid(
                "strategy",
                "max_daily_trades",
                "max_daily_trades must be at least 1",
            ));
        }
        if self.atr_period < 1 {
            return Err(OrbtraderError::invalid(
                "strategy",
                "atr_period",
                "atr_period must be at least 1",
            ));
        }
        if self.trend_ma_period < 1 {
            return Err(OrbtraderError::invalid(
                "strategy",
                "trend_ma_period",
                "trend_ma_period must be at least 1",
            ));
        }

        self.validate_window("orb_window", &self.orb_window)?;
        self.validate_window("entry_window", &self.entry_window)?;
        self.validate_window("exit_window", &self.exit_window)?;

        let overlap = self
            .orb_window
            .hours(self.full_day_trading)
            .any(|h| self.entry_window.contains_hour(h, self.full_day_trading));
        if overlap {
            return Err(OrbtraderError::invalid(
                "session",
                "entry_window",
                format!(
                    "entry_window {} overlaps orb_window {}",
                    self.entry_window, self.orb_window
                ),
            ));
        }

        if self.max_holding_hours < 1 {
            return Err(OrbtraderError::invalid(
                "session",
                "max_holding_hours",
                "max_holding_hours must be at least 1",
            ));
        }
        if TimeDelta::try_hours(self.max_holding_hours).is_none() {
            return Err(OrbtraderError::invalid(
                "session",
                "max_holding_hours",
                format!("max_holding_hours {} is out of range", self.max_holding_hours),
            ));
        }

        require_non_negative("costs", "commission_rate", self.commission_rate)?;
        require_non_negative("costs", "slippage_rate", self.slippage_rate)?;
        if self.commission_rate + self.slippage_rate >= 1.0 {
            return Err(OrbtraderError::invalid(
                "costs",
                "commission_rate",
                "commission_rate + slippage_rate must be below 1",
            ));
        }

        Ok(())
    }

    fn validate_window(&self, key: &str, window: &SessionWindow) -> Result<(), OrbtraderError> {
        if window.start_hour >= HOURS_PER_DAY || window.end_hour > HOURS_PER_DAY {
            return Err(OrbtraderError::invalid(
                "session",
                key,
                format!("{key} {window} must use hours 0-24"),
            ));
        }
        if window.start_hour == window.end_hour {
            return Err(OrbtraderError::invalid(
                "session",
                key,
                format!("{key} {window} is empty"),
            ));
        }
        if window.wraps() && !self.full_day_trading {
            return Err(OrbtraderError::invalid(
                "session",
                key,
                format!("{key} {window} wraps midnight but full_day_trading is off"),
            ));
        }
        Ok(())
    }
}

fn require_positive(section: &str, key: &str, value: f64) -> Result<(), OrbtraderError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(OrbtraderError::invalid(
            section,
            key,
            format!("{key} must be positive"),
        ));
    }
    Ok(())
}

fn require_non_negative(section: &str, key: &str, value: f64) -> Result<(), OrbtraderError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(OrbtraderError::invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(())
}

fn parse_window(
    config: &dyn ConfigPort,
    key: &str,
    default: SessionWindow,
) -> Result<SessionWindow, OrbtraderError> {
    match config.get_string("session", key) {
        None => Ok(default),
        Some(s) => s
            .parse::<SessionWindow>()
            .map_err(|reason| OrbtraderError::invalid("session", key, reason)),
    }
}

fn parse_timezone(config: &dyn ConfigPort) -> Result<Tz, OrbtraderError> {
    match config.get_string("session", "timezone") {
        None => Ok(chrono_tz::UTC),
        Some(name) => name.trim().parse::<Tz>().map_err(|e| {
            OrbtraderError::invalid("session", "timezone", format!("unknown time zone: {e}"))
        }),
    }
}

fn parse_count(config: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, OrbtraderError> {
    let value = config.get_int("strategy", key, default);
    usize::try_from(value)
        .map_err(|_| OrbtraderError::invalid("strategy", key, format!("{key} must be at least 1")))
}

/// Build and validate a [`StrategyConfig`] from the `[strategy]`,
/// `[session]` and `[costs]` sections.
pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, OrbtraderError> {
    let defaults = StrategyConfig::default();

    let risk_per_trade = config
        .get_string("strategy", "risk_per_trade")
        .ok_or_else(|| OrbtraderError::missing("strategy", "risk_per_trade"))?
        .trim()
        .parse::<f64>()
        .map_err(|_| {
            OrbtraderError::invalid("strategy", "risk_per_trade", "risk_per_trade must be a number")
        })?;

    let strategy = StrategyConfig {
        risk_per_trade,
        orb_multiplier: config.get_double("strategy", "orb_multiplier", defaults.orb_multiplier),
        take_profit_multiplier: config.get_double(
            "strategy",
            "take_profit_multiplier",
            defaults.take_profit_multiplier,
        ),
        min_trend_strength: config.get_double(
            "strategy",
            "min_trend_strength",
            defaults.min_trend_strength,
        ),
        orb_window: parse_window(config, "orb_window", defaults.orb_window)?,
        entry_window: parse_window(config, "entry_window", defaults.entry_window)?,
        exit_window: parse_window(config, "exit_window", defaults.exit_window)?,
        session_timezone: parse_timezone(config)?,
        full_day_trading: config.get_bool("session", "full_day_trading", defaults.full_day_trading),
        session_trading: config.get_bool("session", "session_trading", defaults.session_trading),
        force_one_trade: config.get_bool("strategy", "force_one_trade", defaults.force_one_trade),
        max_daily_trades: parse_count(config, "max_daily_trades", 1)?,
        allow_reentry_on_trend_change: config.get_bool(
            "strategy",
            "allow_reentry_on_trend_change",
            defaults.allow_reentry_on_trend_change,
        ),
        use_daily_trend_filter: config.get_bool(
            "strategy",
            "use_daily_trend_filter",
            defaults.use_daily_trend_filter,
        ),
        commission_rate: config.get_double("costs", "commission_rate", defaults.commission_rate),
        slippage_rate: config.get_double("costs", "slippage_rate", defaults.slippage_rate),
        atr_period: parse_count(config, "atr_period", 14)?,
        trend_ma_period: parse_count(config, "trend_ma_period", 3)?,
        min_stop_distance: config.get_double(
            "strategy",
            "min_stop_distance",
            defaults.min_stop_distance,
        ),
        max_holding_hours: config.get_int("session", "max_holding_hours", defaults.max_holding_hours),
    };

    strategy.validate()?;
    Ok(strategy)
}
