//! Portfolio ledger: cash, positions, trade log and equity curve.
//!
//! Every mutation is atomic: validation happens before any field is touched,
//! so a rejected trade leaves the ledger exactly as it was.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::error::TradeError;
use super::position::{Position, Trade, TradeAction};
use super::price_table::{PriceRow, usable_price};

/// Absorbs float rounding when a buy is sized to spend all remaining cash.
const CASH_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn reset(&mut self, initial_capital: f64) {
        *self = Portfolio::new(initial_capital);
    }

    pub fn get_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn can_afford(&self, total_cost: f64) -> bool {
        total_cost <= self.cash + CASH_EPSILON * self.cash.max(1.0)
    }

    pub fn apply_buy(
        &mut self,
        date: NaiveDate,
        ticker: &str,
        quantity: f64,
        price: f64,
        commission: f64,
        slippage: f64,
    ) -> Result<Trade, TradeError> {
        let mut trade = build_trade(
            date,
            ticker,
            TradeAction::Buy,
            quantity,
            price,
            commission,
            slippage,
        )?;

        let total_cost = trade.total_cost();
        if !self.can_afford(total_cost) {
            return Err(TradeError::InsufficientFunds {
                ticker: ticker.to_string(),
                required: total_cost,
                available: self.cash,
            });
        }

        // Within the rounding tolerance: shrink the fill to the cash on hand
        // so the trade log still accounts for every unit of cash.
        if total_cost > self.cash {
            let scale = self.cash / total_cost;
            trade.quantity *= scale;
            trade.commission *= scale;
            trade.slippage *= scale;
            self.cash = 0.0;
        } else {
            self.cash += trade.cash_delta();
        }

        match self.positions.get_mut(ticker) {
            Some(pos) => {
                pos.avg_price = pos.averaged_price(trade.quantity, price);
                pos.quantity += trade.quantity;
                pos.current_price = price;
            }
            None => {
                self.positions
                    .insert(ticker.to_string(), Position::open(ticker, trade.quantity, price));
            }
        }

        debug!(
            %date,
            ticker,
            quantity = trade.quantity,
            price,
            cost = -trade.cash_delta(),
            "executed buy"
        );
        self.trades.push(trade.clone());
        Ok(trade)
    }

    pub fn apply_sell(
        &mut self,
        date: NaiveDate,
        ticker: &str,
        quantity: f64,
        price: f64,
        commission: f64,
        slippage: f64,
    ) -> Result<Trade, TradeError> {
        let held = match self.positions.get(ticker) {
            Some(pos) => pos.quantity,
            None => {
                return Err(TradeError::InvalidPosition {
                    ticker: ticker.to_string(),
                    reason: "no position held".to_string(),
                });
            }
        };
        if quantity > held {
            return Err(TradeError::InvalidPosition {
                ticker: ticker.to_string(),
                reason: format!("sell quantity {quantity} exceeds held {held}"),
            });
        }

        let trade = build_trade(
            date,
            ticker,
            TradeAction::Sell,
            quantity,
            price,
            commission,
            slippage,
        )?;

        let proceeds = trade.cash_delta();
        if self.cash + proceeds < 0.0 {
            return Err(TradeError::InvalidPosition {
                ticker: ticker.to_string(),
                reason: format!("costs exceed sale value, proceeds {proceeds}"),
            });
        }
        self.cash += proceeds;
        let remaining = held - quantity;
        if remaining == 0.0 {
            self.positions.remove(ticker);
        } else if let Some(pos) = self.positions.get_mut(ticker) {
            pos.quantity = remaining;
            pos.current_price = price;
        }

        debug!(%date, ticker, quantity, price, proceeds, "executed sell");
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Revalue held positions at the row's prices. Positions without a usable
    /// price keep their last mark.
    pub fn mark_to_market(&mut self, row: &PriceRow<'_>) {
        for pos in self.positions.values_mut() {
            if let Some(price) = row.price(&pos.ticker) {
                pos.current_price = price;
            }
        }
    }

    /// `cash + Σ market_value` at the row's prices, falling back to the last
    /// mark for tickers missing from the row.
    pub fn portfolio_value(&self, row: &PriceRow<'_>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| pos.quantity * row.price(&pos.ticker).unwrap_or(pos.current_price))
            .sum();
        self.cash + position_value
    }

    /// `cash + Σ market_value` at current marks.
    pub fn total_equity(&self) -> f64 {
        self.cash + self.positions.values().map(Position::market_value).sum::<f64>()
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    /// Mark to market and append the resulting value to the equity curve.
    pub fn snapshot(&mut self, row: &PriceRow<'_>) -> f64 {
        self.mark_to_market(row);
        let equity = self.total_equity();
        self.record_equity(row.date, equity);
        equity
    }

    /// Fraction of total equity held in each ticker at current marks.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        let total = self.total_equity();
        self.positions
            .iter()
            .map(|(ticker, pos)| {
                let w = if total > 0.0 {
                    pos.market_value() / total
                } else {
                    0.0
                };
                (ticker.clone(), w)
            })
            .collect()
    }
}

fn build_trade(
    date: NaiveDate,
    ticker: &str,
    action: TradeAction,
    quantity: f64,
    price: f64,
    commission: f64,
    slippage: f64,
) -> Result<Trade, TradeError> {
    if usable_price(Some(price)).is_none() {
        return Err(TradeError::MissingPrice {
            ticker: ticker.to_string(),
        });
    }
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(TradeError::InvalidPosition {
            ticker: ticker.to_string(),
            reason: format!("quantity must be positive, got {quantity}"),
        });
    }
    if !(commission >= 0.0 && slippage >= 0.0) {
        return Err(TradeError::InvalidPosition {
            ticker: ticker.to_string(),
            reason: "commission and slippage must be non-negative".to_string(),
        });
    }
    Ok(Trade {
        date,
        ticker: ticker.to_string(),
        action,
        quantity,
        price,
        commission,
        slippage,
    })
}
