//! Core domain types and logic. No I/O.

pub mod backtest;
pub mod candle;
pub mod config;
pub mod cost;
pub mod entry;
pub mod error;
pub mod exit;
pub mod manager;
pub mod metrics;
pub mod position;
pub mod range;
pub mod session;
pub mod trade;
pub mod trend;
pub mod universe;
