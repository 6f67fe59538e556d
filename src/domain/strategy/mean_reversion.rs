//! Bollinger-style mean reversion.
//!
//! Over a rolling `window` ending at the current row, buy (`1.0`) when the
//! price is below `mean - num_std * std` and liquidate (`-1.0`) when it is
//! above `mean + num_std * std`.

use crate::domain::price_table::PriceTable;
use crate::domain::signal::{SignalGenerator, SignalKind, SignalMatrix};
use crate::domain::stats::{mean, sample_std};

pub const BUY_SIGNAL: f64 = 1.0;
pub const SELL_SIGNAL: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversion {
    pub window: usize,
    pub num_std: f64,
}

impl MeanReversion {
    pub fn new(window: usize, num_std: f64) -> Self {
        MeanReversion { window, num_std }
    }

    fn signal_at(&self, prices: &PriceTable, row: usize, col: usize) -> f64 {
        if self.window == 0 || row + 1 < self.window {
            return 0.0;
        }
        let window: Option<Vec<f64>> = (row + 1 - self.window..=row)
            .map(|i| prices.price(i, col))
            .collect();
        let Some(window) = window else {
            return 0.0;
        };

        let center = mean(&window);
        let band = self.num_std * sample_std(&window);
        let price = window[window.len() - 1];

        if price < center - band {
            BUY_SIGNAL
        } else if price > center + band {
            SELL_SIGNAL
        } else {
            0.0
        }
    }
}

impl SignalGenerator for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn generate(&self, prices: &PriceTable) -> SignalMatrix {
        let mut signals = SignalMatrix::zeros(prices, SignalKind::CashFraction);
        for row in 0..prices.len() {
            for col in 0..prices.tickers().len() {
                let value = self.signal_at(prices, row, col);
                if value != 0.0 {
                    signals.set(row, col, value);
                }
            }
        }
        signals
    }
}
