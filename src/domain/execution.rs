//! Trade execution against the ledger.
//!
//! Converts one date's signal row into concrete buys and sells, applying the
//! proportional commission and slippage cost model. Nothing here aborts a
//! run: every skipped action comes back as a [`Diagnostic`].

use chrono::NaiveDate;
use tracing::debug;

use super::error::{Diagnostic, TradeError};
use super::portfolio::Portfolio;
use super::position::Trade;
use super::price_table::PriceRow;
use super::signal::{SignalKind, SignalRow};

/// Rebalance adjustments below this fraction of portfolio value are skipped.
const REBALANCE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExecutionConfig {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl ExecutionConfig {
    pub fn commission(&self, notional: f64) -> f64 {
        notional * self.commission_rate
    }

    pub fn slippage(&self, notional: f64) -> f64 {
        notional * self.slippage_rate
    }

    /// Cash needed per unit of notional on a buy.
    fn buy_cost_factor(&self) -> f64 {
        1.0 + self.commission_rate + self.slippage_rate
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub trades: Vec<Trade>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExecutionReport {
    fn skip(&mut self, date: NaiveDate, err: TradeError) {
        debug!(%date, ticker = err.ticker(), reason = %err, "skipped");
        self.diagnostics.push(Diagnostic::recoverable(date, &err));
    }

    fn record(&mut self, date: NaiveDate, result: Result<Trade, TradeError>) {
        match result {
            Ok(trade) => self.trades.push(trade),
            Err(err) => self.skip(date, err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExecutionSimulator {
    pub config: ExecutionConfig,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        ExecutionSimulator { config }
    }

    /// Execute `signals` according to their kind.
    pub fn apply(
        &self,
        portfolio: &mut Portfolio,
        kind: SignalKind,
        signals: &SignalRow<'_>,
        prices: &PriceRow<'_>,
    ) -> ExecutionReport {
        match kind {
            SignalKind::CashFraction => self.execute(portfolio, signals, prices),
            SignalKind::TargetWeight => self.rebalance(portfolio, signals, prices),
        }
    }

    /// Cash-fraction execution.
    ///
    /// `s > 0` spends `cash * s` on the ticker at cash as it stands when the
    /// ticker is reached; `s < 0` liquidates any held position; `s == 0` is
    /// no action. Unaffordable buys are skipped without touching the ledger.
    pub fn execute(
        &self,
        portfolio: &mut Portfolio,
        signals: &SignalRow<'_>,
        prices: &PriceRow<'_>,
    ) -> ExecutionReport {
        let date = signals.date;
        let mut report = ExecutionReport::default();

        for (ticker, signal) in signals.iter() {
            if signal == 0.0 || signal.is_nan() {
                continue;
            }
            let Some(price) = prices.price(ticker) else {
                report.skip(
                    date,
                    TradeError::MissingPrice {
                        ticker: ticker.to_string(),
                    },
                );
                continue;
            };

            if signal > 0.0 {
                let target_value = portfolio.cash * signal.min(1.0);
                let quantity = target_value / price;
                if quantity > 0.0 {
                    self.try_buy(portfolio, &mut report, date, ticker, quantity, price);
                }
            } else if let Some(pos) = portfolio.get_position(ticker) {
                let quantity = pos.quantity;
                self.sell(portfolio, &mut report, date, ticker, quantity, price);
            }
        }

        report
    }

    /// Target-weight execution: sell overweight holdings first, then buy
    /// underweight tickers with the freed cash. Inactive rows do nothing.
    pub fn rebalance(
        &self,
        portfolio: &mut Portfolio,
        weights: &SignalRow<'_>,
        prices: &PriceRow<'_>,
    ) -> ExecutionReport {
        let date = weights.date;
        let mut report = ExecutionReport::default();
        if !weights.is_active() {
            return report;
        }

        let total_value = portfolio.portfolio_value(prices);
        let tolerance = REBALANCE_TOLERANCE * total_value.max(1.0);
        let mut buys = Vec::new();

        for (ticker, weight) in weights.iter() {
            let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
            let held = portfolio.get_position(ticker).map(|p| p.quantity);
            if weight == 0.0 && held.is_none() {
                continue;
            }
            let Some(price) = prices.price(ticker) else {
                report.skip(
                    date,
                    TradeError::MissingPrice {
                        ticker: ticker.to_string(),
                    },
                );
                continue;
            };

            let held = held.unwrap_or(0.0);
            let current_value = held * price;
            let target_value = total_value * weight;

            if current_value > target_value + tolerance {
                let quantity = if weight == 0.0 {
                    held
                } else {
                    ((current_value - target_value) / price).min(held)
                };
                self.sell(portfolio, &mut report, date, ticker, quantity, price);
            } else if target_value > current_value + tolerance {
                buys.push((ticker, target_value - current_value, price));
            }
        }

        let factor = self.config.buy_cost_factor();
        for (ticker, shortfall, price) in buys {
            let affordable = portfolio.cash / (price * factor);
            let quantity = (shortfall / (price * factor)).min(affordable);
            if quantity * price > tolerance {
                self.try_buy(portfolio, &mut report, date, ticker, quantity, price);
            }
        }

        report
    }

    fn try_buy(
        &self,
        portfolio: &mut Portfolio,
        report: &mut ExecutionReport,
        date: NaiveDate,
        ticker: &str,
        quantity: f64,
        price: f64,
    ) {
        let notional = quantity * price;
        let commission = self.config.commission(notional);
        let slippage = self.config.slippage(notional);
        let total_cost = notional + commission + slippage;

        if !portfolio.can_afford(total_cost) {
            report.skip(
                date,
                TradeError::InsufficientFunds {
                    ticker: ticker.to_string(),
                    required: total_cost,
                    available: portfolio.cash,
                },
            );
            return;
        }

        let result = portfolio.apply_buy(date, ticker, quantity, price, commission, slippage);
        report.record(date, result);
    }

    fn sell(
        &self,
        portfolio: &mut Portfolio,
        report: &mut ExecutionReport,
        date: NaiveDate,
        ticker: &str,
        quantity: f64,
        price: f64,
    ) {
        let notional = quantity * price;
        let commission = self.config.commission(notional);
        let slippage = self.config.slippage(notional);
        let result = portfolio.apply_sell(date, ticker, quantity, price, commission, slippage);
        report.record(date, result);
    }
}
