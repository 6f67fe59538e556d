//! Position sizing: target weights for a rebalance date.
//!
//! Weights are computed from trailing returns over the `lookback` rows that
//! end at the rebalance row, so a rebalance never looks ahead.
//!
//! - equal_weight: w[i] = 1 / n
//! - risk_parity:  w[i] ∝ 1 / std(returns[i])
//! - optimized:    w[i] ∝ max(mean(returns[i]), 0) / var(returns[i])
//!
//! Risk parity and optimized fall back to equal weight when any ticker lacks
//! enough history or no ticker has a usable score.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::price_table::PriceTable;
use crate::domain::stats::{mean, sample_std, sample_variance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSizing {
    EqualWeight,
    RiskParity,
    Optimized,
}

/// Minimum trailing returns a ticker needs before volatility is trusted.
pub const MIN_SIZING_RETURNS: usize = 2;

impl PositionSizing {
    pub fn weights(&self, prices: &PriceTable, row: usize, lookback: usize) -> Vec<f64> {
        let n = prices.tickers().len();
        if n == 0 {
            return Vec::new();
        }
        let equal = vec![1.0 / n as f64; n];

        let scores: Option<Vec<f64>> = match self {
            PositionSizing::EqualWeight => return equal,
            PositionSizing::RiskParity => (0..n)
                .map(|col| {
                    let returns = trailing_returns(prices, col, row, lookback)?;
                    let std = sample_std(&returns);
                    (std > 0.0).then(|| 1.0 / std)
                })
                .collect(),
            PositionSizing::Optimized => (0..n)
                .map(|col| {
                    let returns = trailing_returns(prices, col, row, lookback)?;
                    let var = sample_variance(&returns);
                    (var > 0.0).then(|| mean(&returns).max(0.0) / var)
                })
                .collect(),
        };

        match scores {
            Some(scores) => normalize(&scores).unwrap_or(equal),
            None => equal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSizing::EqualWeight => "equal_weight",
            PositionSizing::RiskParity => "risk_parity",
            PositionSizing::Optimized => "optimized",
        }
    }
}

/// Scale scores to sum to one; `None` when nothing is positive.
fn normalize(scores: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = scores.iter().filter(|s| s.is_finite()).sum();
    if !(total > 0.0) {
        return None;
    }
    Some(
        scores
            .iter()
            .map(|s| if s.is_finite() { s / total } else { 0.0 })
            .collect(),
    )
}

/// Returns over rows `row - lookback ..= row` for one column. `None` if the
/// window is too short or any price in it is unusable.
fn trailing_returns(prices: &PriceTable, col: usize, row: usize, lookback: usize) -> Option<Vec<f64>> {
    if lookback < MIN_SIZING_RETURNS || row < lookback {
        return None;
    }
    let window: Option<Vec<f64>> = (row - lookback..=row).map(|i| prices.price(i, col)).collect();
    let window = window?;
    Some(window.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
}

impl FromStr for PositionSizing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal_weight" => Ok(PositionSizing::EqualWeight),
            "risk_parity" => Ok(PositionSizing::RiskParity),
            "optimized" => Ok(PositionSizing::Optimized),
            other => Err(format!(
                "unknown position sizing '{other}' (expected equal_weight, risk_parity or optimized)"
            )),
        }
    }
}

impl fmt::Display for PositionSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
