//! Buy-and-hold: invest on the first date, then do nothing.
//!
//! Row 0 carries `1.0` for every ticker (cash-fraction semantics, so the
//! first ticker absorbs all cash). With `split_evenly`, row 0 carries
//! `1 / (n - i)` for the i-th ticker so each of the n tickers gets an equal
//! share of the starting cash.

use crate::domain::price_table::PriceTable;
use crate::domain::signal::{SignalGenerator, SignalKind, SignalMatrix};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuyAndHold {
    pub split_evenly: bool,
}

impl SignalGenerator for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn generate(&self, prices: &PriceTable) -> SignalMatrix {
        let mut signals = SignalMatrix::zeros(prices, SignalKind::CashFraction);
        if prices.is_empty() {
            return signals;
        }

        let n = prices.tickers().len();
        for col in 0..n {
            let value = if self.split_evenly {
                1.0 / (n - col) as f64
            } else {
                1.0
            };
            signals.set(0, col, value);
        }
        signals
    }
}
