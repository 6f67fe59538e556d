//! Cross-sectional momentum.
//!
//! After `lookback_period` rows of warm-up, ranks tickers by their trailing
//! return `p[i] / p[i - lookback] - 1` and holds the best `top_n` at equal
//! weight. Signals are target weights, so tickers that drop out of the top
//! set are sold on the next active date.

use crate::domain::price_table::PriceTable;
use crate::domain::signal::{RebalanceFrequency, SignalGenerator, SignalKind, SignalMatrix};

#[derive(Debug, Clone, PartialEq)]
pub struct Momentum {
    pub lookback_period: usize,
    pub top_n: usize,
    pub frequency: RebalanceFrequency,
}

impl Momentum {
    pub fn new(lookback_period: usize, top_n: usize) -> Self {
        Momentum {
            lookback_period,
            top_n,
            frequency: RebalanceFrequency::Daily,
        }
    }

    pub fn with_frequency(mut self, frequency: RebalanceFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Target weights for `row`, or `None` while warming up or when no
    /// ticker can be ranked.
    fn weights_at(&self, prices: &PriceTable, row: usize) -> Option<Vec<f64>> {
        if self.lookback_period == 0 || self.top_n == 0 || row < self.lookback_period {
            return None;
        }
        let n = prices.tickers().len();
        let start = row - self.lookback_period;

        let mut ranked: Vec<(usize, f64)> = (0..n)
            .filter_map(|col| {
                let then = prices.price(start, col)?;
                let now = prices.price(row, col)?;
                Some((col, now / then - 1.0))
            })
            .collect();
        if ranked.is_empty() {
            return None;
        }

        // stable sort keeps column order among equal returns
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let selected = ranked.len().min(self.top_n);
        let weight = 1.0 / selected as f64;

        let mut weights = vec![0.0; n];
        for (col, _) in ranked.into_iter().take(selected) {
            weights[col] = weight;
        }
        Some(weights)
    }
}

impl SignalGenerator for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn generate(&self, prices: &PriceTable) -> SignalMatrix {
        let mut signals = SignalMatrix::zeros(prices, SignalKind::TargetWeight);
        for row in self.frequency.schedule(prices.dates()) {
            if let Some(weights) = self.weights_at(prices, row) {
                signals.set_row(row, &weights);
            }
        }
        signals
    }
}
