//! Scheduled rebalance to target weights.
//!
//! On every date selected by the rebalance frequency, emits the target weight
//! per ticker; zero elsewhere. Targets come either from fixed configured
//! weights or from a [`PositionSizing`] rule evaluated on that date.

use std::collections::BTreeMap;

use super::sizing::PositionSizing;
use crate::domain::price_table::PriceTable;
use crate::domain::signal::{RebalanceFrequency, SignalGenerator, SignalKind, SignalMatrix};

pub const DEFAULT_SIZING_LOOKBACK: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum TargetWeights {
    Sizing {
        rule: PositionSizing,
        lookback: usize,
    },
    /// Ticker → weight. Tickers not listed get zero.
    Fixed(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledRebalance {
    pub frequency: RebalanceFrequency,
    pub targets: TargetWeights,
}

impl ScheduledRebalance {
    pub fn with_sizing(frequency: RebalanceFrequency, rule: PositionSizing) -> Self {
        ScheduledRebalance {
            frequency,
            targets: TargetWeights::Sizing {
                rule,
                lookback: DEFAULT_SIZING_LOOKBACK,
            },
        }
    }

    pub fn with_weights(frequency: RebalanceFrequency, weights: BTreeMap<String, f64>) -> Self {
        ScheduledRebalance {
            frequency,
            targets: TargetWeights::Fixed(weights),
        }
    }

    fn targets_at(&self, prices: &PriceTable, row: usize) -> Vec<f64> {
        match &self.targets {
            TargetWeights::Sizing { rule, lookback } => rule.weights(prices, row, *lookback),
            TargetWeights::Fixed(weights) => prices
                .tickers()
                .iter()
                .map(|t| weights.get(t).copied().unwrap_or(0.0))
                .collect(),
        }
    }
}

impl SignalGenerator for ScheduledRebalance {
    fn name(&self) -> &str {
        "rebalance"
    }

    fn generate(&self, prices: &PriceTable) -> SignalMatrix {
        let mut signals = SignalMatrix::zeros(prices, SignalKind::TargetWeight);
        for row in self.frequency.schedule(prices.dates()) {
            let targets = self.targets_at(prices, row);
            signals.set_row(row, &targets);
        }
        signals
    }
}
