//! Core domain types and logic.

pub mod ohlcv;
pub mod timeframe;
pub mod error;
pub mod indicator;
pub mod signal;
pub mod strategy;
pub mod action_zone;
pub mod position;
pub mod trade;
pub mod portfolio;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod report;
pub mod config_validation;
