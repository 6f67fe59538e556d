//! Run several strategies over the same prices and tabulate the results.
//!
//! Each strategy gets its own [`Backtester`] and ledger; the price table is
//! shared read-only across rayon workers.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::backtest::{BacktestResult, Backtester, RunConfig};
use super::error::{Severity, SimError};
use super::price_table::PriceTable;
use super::signal::SignalGenerator;
use super::strategy::Strategy;

/// One line of the comparison summary. Percent fields are ×100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub strategy: String,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub num_trades: usize,
}

impl From<&BacktestResult> for SummaryRow {
    fn from(r: &BacktestResult) -> Self {
        SummaryRow {
            strategy: r.strategy.clone(),
            total_return_pct: r.total_return_pct,
            annualized_return_pct: r.annualized_return_pct,
            volatility_pct: r.volatility_pct,
            sharpe_ratio: r.sharpe_ratio,
            max_drawdown_pct: r.max_drawdown_pct,
            num_trades: r.num_trades,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: String,
}

#[derive(Debug)]
pub struct Comparison {
    /// Per-strategy outcome, in input order.
    pub results: Vec<(String, Result<BacktestResult, SimError>)>,
}

impl Comparison {
    /// Summary rows for the strategies that completed, in input order.
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .map(SummaryRow::from)
            .collect()
    }

    pub fn failures(&self) -> Vec<StrategyFailure> {
        self.results
            .iter()
            .filter_map(|(name, r)| {
                r.as_ref().err().map(|e| StrategyFailure {
                    strategy: name.clone(),
                    error: e.to_string(),
                })
            })
            .collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &BacktestResult> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Completed strategy with the highest Sharpe ratio.
    pub fn best_by_sharpe(&self) -> Option<&BacktestResult> {
        self.successes()
            .max_by(|a, b| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
    }
}

pub fn compare(prices: &PriceTable, config: &RunConfig, strategies: &[Strategy]) -> Comparison {
    let results = strategies
        .par_iter()
        .map(|strategy| {
            let name = strategy.name().to_string();
            let result = Backtester::new(config.clone()).run(prices, strategy);
            match &result {
                Err(e) if e.severity() == Severity::Recoverable => {
                    info!(strategy = %name, error = %e, "strategy produced no result")
                }
                Err(e) => warn!(strategy = %name, error = %e, "strategy failed"),
                Ok(_) => {}
            }
            (name, result)
        })
        .collect();

    Comparison { results }
}
