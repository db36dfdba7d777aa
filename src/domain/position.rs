//! Open position and its trigger checks.

use std::fmt;

use chrono::{DateTime, Utc};

use super::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position between entry and exit. Never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_time: DateTime<Utc>,
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub size: f64,
    pub used_fallback: bool,
}

impl OpenPosition {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn risk_per_unit(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn risk_in_quote(&self) -> f64 {
        self.risk_per_unit() * self.size
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.size
    }

    /// Whether the candle's range touched the stop.
    pub fn should_stop_loss(&self, candle: &Candle) -> bool {
        if self.is_long() {
            candle.low <= self.stop_loss
        } else {
            candle.high >= self.stop_loss
        }
    }

    /// Whether the candle's range touched the target.
    pub fn should_take_profit(&self, candle: &Candle) -> bool {
        if self.is_long() {
            candle.high >= self.take_profit
        } else {
            candle.low <= self.take_profit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(high: f64, low: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 0.0,
        }
    }

    fn long_position() -> OpenPosition {
        OpenPosition {
            entry_time: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            side: Side::Long,
            entry_price: 50.0,
            stop_loss: 45.0,
            take_profit: 60.0,
            size: 10.0,
            used_fallback: false,
        }
    }

    fn short_position() -> OpenPosition {
        OpenPosition {
            side: Side::Short,
            entry_price: 100.0,
            stop_loss: 110.0,
            take_profit: 80.0,
            ..long_position()
        }
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
        assert_eq!(Side::Long.sign(), 1.0);
        assert_eq!(Side::Short.sign(), -1.0);
        assert_eq!(Side::Short.to_string(), "short");
    }

    #[test]
    fn risk_per_unit_and_quote() {
        let pos = long_position();
        assert!((pos.risk_per_unit() - 5.0).abs() < f64::EPSILON);
        assert!((pos.risk_in_quote() - 50.0).abs() < f64::EPSILON);
        assert!((short_position().risk_per_unit() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_by_side() {
        assert!((long_position().unrealized_pnl(55.0) - 50.0).abs() < f64::EPSILON);
        assert!((long_position().unrealized_pnl(45.0) + 50.0).abs() < f64::EPSILON);
        assert!((short_position().unrealized_pnl(90.0) - 100.0).abs() < f64::EPSILON);
        assert!((short_position().unrealized_pnl(110.0) + 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_loss_long_uses_low() {
        let pos = long_position();
        assert!(pos.should_stop_loss(&bar(52.0, 44.0)));
        assert!(pos.should_stop_loss(&bar(52.0, 45.0)));
        assert!(!pos.should_stop_loss(&bar(52.0, 46.0)));
    }

    #[test]
    fn stop_loss_short_uses_high() {
        let pos = short_position();
        assert!(pos.should_stop_loss(&bar(111.0, 100.0)));
        assert!(pos.should_stop_loss(&bar(110.0, 100.0)));
        assert!(!pos.should_stop_loss(&bar(109.0, 100.0)));
    }

    #[test]
    fn take_profit_long_uses_high() {
        let pos = long_position();
        assert!(pos.should_take_profit(&bar(61.0, 50.0)));
        assert!(pos.should_take_profit(&bar(60.0, 50.0)));
        assert!(!pos.should_take_profit(&bar(59.0, 50.0)));
    }

    #[test]
    fn take_profit_short_uses_low() {
        let pos = short_position();
        assert!(pos.should_take_profit(&bar(100.0, 79.0)));
        assert!(pos.should_take_profit(&bar(100.0, 80.0)));
        assert!(!pos.should_take_profit(&bar(100.0, 81.0)));
    }
}
