//! Backtest orchestrator and the result document.
//!
//! [`RunConfig`] defines run parameters. [`Backtester`] drives one strategy
//! over a price table: for each date in order it fetches the signal row,
//! executes it, marks to market and records equity. The run owns its ledger,
//! so independent backtests can run in parallel over a shared table.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::error::{Diagnostic, SimError};
use super::execution::{ExecutionConfig, ExecutionSimulator};
use super::metrics::Metrics;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::Trade;
use super::price_table::PriceTable;
use super::signal::{RebalanceFrequency, SignalGenerator};
use super::strategy::PositionSizing;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub rebalance_frequency: RebalanceFrequency,
    pub position_sizing: PositionSizing,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission_rate: 0.0,
            slippage_rate: 0.0,
            rebalance_frequency: RebalanceFrequency::Monthly,
            position_sizing: PositionSizing::EqualWeight,
            start_date: None,
            end_date: None,
        }
    }
}

impl RunConfig {
    /// Numeric checks applied before any run. Mirrors the checks made on
    /// configuration files.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(SimError::invalid(
                "backtest",
                "initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        for (key, rate) in [
            ("commission_rate", self.commission_rate),
            ("slippage_rate", self.slippage_rate),
        ] {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(SimError::invalid(
                    "backtest",
                    key,
                    format!("must be non-negative, got {rate}"),
                ));
            }
        }
        // Costs at or above the notional would make every sale cost cash.
        if self.commission_rate + self.slippage_rate >= 1.0 {
            return Err(SimError::invalid(
                "backtest",
                "commission_rate",
                format!(
                    "commission_rate + slippage_rate must be below 1, got {}",
                    self.commission_rate + self.slippage_rate
                ),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(SimError::invalid(
                    "backtest",
                    "start_date",
                    format!("start_date ({start}) is after end_date ({end})"),
                ));
            }
        }
        Ok(())
    }

    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_rate: self.commission_rate,
            slippage_rate: self.slippage_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initialized,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    #[serde(rename = "return")]
    pub ret: f64,
}

/// Serializable summary of one run. Percent fields are ×100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration: usize,
    pub num_trades: usize,
    pub num_days: usize,
    pub skipped_trades: usize,
    pub truncated: bool,
    pub equity_curve: Vec<EquityPoint>,
    pub returns_series: Vec<ReturnPoint>,
    pub trades: Vec<Trade>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BacktestResult {
    fn build(
        strategy: &str,
        portfolio: &Portfolio,
        metrics: Metrics,
        diagnostics: Vec<Diagnostic>,
        truncated: bool,
    ) -> Self {
        let returns_series = portfolio
            .equity_curve
            .iter()
            .skip(1)
            .zip(&metrics.returns)
            .map(|(point, ret)| ReturnPoint {
                date: point.date,
                ret: *ret,
            })
            .collect();

        BacktestResult {
            strategy: strategy.to_string(),
            initial_capital: portfolio.initial_capital,
            final_value: metrics.final_value,
            total_return_pct: metrics.total_return * 100.0,
            annualized_return_pct: metrics.annualized_return * 100.0,
            volatility_pct: metrics.volatility * 100.0,
            sharpe_ratio: metrics.sharpe_ratio,
            sortino_ratio: metrics.sortino_ratio,
            max_drawdown_pct: metrics.max_drawdown * 100.0,
            max_drawdown_duration: metrics.max_drawdown_duration,
            num_trades: portfolio.trades.len(),
            num_days: metrics.num_days,
            skipped_trades: diagnostics.iter().filter(|d| d.is_skipped_trade()).count(),
            truncated,
            equity_curve: portfolio.equity_curve.clone(),
            returns_series,
            trades: portfolio.trades.clone(),
            diagnostics,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backtester {
    config: RunConfig,
    state: RunState,
    portfolio: Portfolio,
}

impl Backtester {
    pub fn new(config: RunConfig) -> Self {
        let portfolio = Portfolio::new(config.initial_capital);
        Backtester {
            config,
            state: RunState::Initialized,
            portfolio,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Ledger as left by the last run.
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn run<S>(&mut self, prices: &PriceTable, strategy: &S) -> Result<BacktestResult, SimError>
    where
        S: SignalGenerator + ?Sized,
    {
        self.run_with_cancel(prices, strategy, &AtomicBool::new(false))
    }

    /// Like [`Backtester::run`], but stops before the next date once `cancel`
    /// is set. The result covers the dates processed so far and is flagged
    /// `truncated`.
    pub fn run_with_cancel<S>(
        &mut self,
        prices: &PriceTable,
        strategy: &S,
        cancel: &AtomicBool,
    ) -> Result<BacktestResult, SimError>
    where
        S: SignalGenerator + ?Sized,
    {
        self.state = RunState::Initialized;
        if let Err(e) = self.config.validate() {
            self.state = RunState::Failed;
            return Err(e);
        }

        let table = match (self.config.start_date, self.config.end_date) {
            (None, None) => Cow::Borrowed(prices),
            (start, end) => Cow::Owned(prices.filter_dates(start, end)),
        };

        let signals = strategy.generate(&table);
        if signals.len() != table.len() || signals.tickers() != table.tickers() {
            self.state = RunState::Failed;
            return Err(SimError::Data {
                reason: format!(
                    "strategy {} produced {} signal rows for {} price rows",
                    strategy.name(),
                    signals.len(),
                    table.len()
                ),
            });
        }

        let simulator = ExecutionSimulator::new(self.config.execution());
        self.portfolio.reset(self.config.initial_capital);
        self.state = RunState::Running;
        info!(
            strategy = strategy.name(),
            rows = table.len(),
            tickers = table.tickers().len(),
            "backtest started"
        );

        let mut diagnostics = Vec::new();
        let mut truncated = false;
        for i in 0..table.len() {
            if cancel.load(Ordering::Relaxed) {
                truncated = true;
                break;
            }
            let row = table.row(i);
            let report = simulator.apply(&mut self.portfolio, signals.kind, &signals.row(i), &row);
            diagnostics.extend(report.diagnostics);
            let equity = self.portfolio.snapshot(&row);
            debug!(date = %row.date, equity, "step");
        }

        self.state = RunState::Completed;
        info!(
            strategy = strategy.name(),
            days = self.portfolio.equity_curve.len(),
            trades = self.portfolio.trades.len(),
            skipped = diagnostics.len(),
            truncated,
            "backtest finished"
        );

        let metrics = Metrics::compute(&self.portfolio.equity_curve, self.config.initial_capital)?;
        Ok(BacktestResult::build(
            strategy.name(),
            &self.portfolio,
            metrics,
            diagnostics,
            truncated,
        ))
    }
}
