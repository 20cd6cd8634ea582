//! Core domain types and logic.

pub mod ohlcv;
pub mod signal;
pub mod indicator;
pub mod strategy;
pub mod ledger;
pub mod backtest;
pub mod metrics;
pub mod optimizer;
pub mod comparison;
pub mod batch;
pub mod config_validation;
pub mod error;
