//! Positions and the immutable trade record.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub ticker: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
}

impl Position {
    pub fn open(ticker: &str, quantity: f64, price: f64) -> Self {
        Position {
            ticker: ticker.to_string(),
            quantity,
            avg_price: price,
            current_price: price,
        }
    }

    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_price
    }

    pub fn pnl(&self) -> f64 {
        self.market_value() - self.cost_basis()
    }

    /// Weighted-average price after adding `quantity` at `price`.
    pub fn averaged_price(&self, quantity: f64, price: f64) -> f64 {
        (self.quantity * self.avg_price + quantity * price) / (self.quantity + quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub ticker: String,
    pub action: TradeAction,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub slippage: f64,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Cash consumed by a buy.
    pub fn total_cost(&self) -> f64 {
        self.notional() + self.commission + self.slippage
    }

    /// Cash received from a sell.
    pub fn proceeds(&self) -> f64 {
        self.notional() - self.commission - self.slippage
    }

    /// Signed cash impact on the ledger.
    pub fn cash_delta(&self) -> f64 {
        match self.action {
            TradeAction::Buy => -self.total_cost(),
            TradeAction::Sell => self.proceeds(),
        }
    }
}
