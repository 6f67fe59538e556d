//! Strategy signal generators.
//!
//! Each strategy is a pure function of the price table: it never sees the
//! ledger and only reads prices up to the row it is signalling on.

pub mod buy_and_hold;
pub mod mean_reversion;
pub mod momentum;
pub mod rebalance;
pub mod sizing;

pub use buy_and_hold::BuyAndHold;
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use rebalance::{ScheduledRebalance, TargetWeights};
pub use sizing::PositionSizing;

use super::price_table::PriceTable;
use super::signal::{SignalGenerator, SignalMatrix};

/// Names accepted in `[strategies] enabled`.
pub const STRATEGY_NAMES: [&str; 4] = ["buy_and_hold", "rebalance", "momentum", "mean_reversion"];

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    BuyAndHold(BuyAndHold),
    ScheduledRebalance(ScheduledRebalance),
    Momentum(Momentum),
    MeanReversion(MeanReversion),
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &str {
        match self {
            Strategy::BuyAndHold(s) => s.name(),
            Strategy::ScheduledRebalance(s) => s.name(),
            Strategy::Momentum(s) => s.name(),
            Strategy::MeanReversion(s) => s.name(),
        }
    }

    fn generate(&self, prices: &PriceTable) -> SignalMatrix {
        match self {
            Strategy::BuyAndHold(s) => s.generate(prices),
            Strategy::ScheduledRebalance(s) => s.generate(prices),
            Strategy::Momentum(s) => s.generate(prices),
            Strategy::MeanReversion(s) => s.generate(prices),
        }
    }
}

impl From<BuyAndHold> for Strategy {
    fn from(s: BuyAndHold) -> Self {
        Strategy::BuyAndHold(s)
    }
}

impl From<ScheduledRebalance> for Strategy {
    fn from(s: ScheduledRebalance) -> Self {
        Strategy::ScheduledRebalance(s)
    }
}

impl From<Momentum> for Strategy {
    fn from(s: Momentum) -> Self {
        Strategy::Momentum(s)
    }
}

impl From<MeanReversion> for Strategy {
    fn from(s: MeanReversion) -> Self {
        Strategy::MeanReversion(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::RebalanceFrequency;

    #[test]
    fn names_match_config_keys() {
        let strategies: Vec<Strategy> = vec![
            BuyAndHold::default().into(),
            ScheduledRebalance::with_sizing(RebalanceFrequency::Monthly, PositionSizing::EqualWeight).into(),
            Momentum::new(20, 2).into(),
            MeanReversion::new(20, 2.0).into(),
        ];
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        assert_eq!(names, STRATEGY_NAMES.to_vec());
    }
}
