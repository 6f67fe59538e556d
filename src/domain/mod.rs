//! Core domain types and logic: ledger, execution, strategies, analysis.

pub mod backtest;
pub mod comparison;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod portfolio;
pub mod position;
pub mod price_table;
pub mod signal;
pub mod stats;
pub mod strategy;
