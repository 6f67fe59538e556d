//! Performance metrics over an equity curve.
//!
//! All ratios are annualized with 252 trading days per year. Degenerate
//! inputs (zero volatility, no downside, a single point) yield 0 rather
//! than NaN or infinity.

use super::error::SimError;
use super::portfolio::EquityPoint;
use super::stats::{pct_change, sample_std};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Deepest peak-to-trough decline as a non-positive fraction.
    pub max_drawdown: f64,
    /// Longest run of rows spent below the running peak.
    pub max_drawdown_duration: usize,
    pub num_days: usize,
    /// Period returns; `returns[i]` is the return into row `i + 1`.
    pub returns: Vec<f64>,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], initial_capital: f64) -> Result<Self, SimError> {
        let last = equity_curve.last().ok_or(SimError::EmptyResult)?;
        let final_value = last.equity;
        let num_days = equity_curve.len();

        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let num_years = num_days as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = annualize(total_return, num_years);

        let values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let returns = pct_change(&values);

        let volatility = sample_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = if volatility > 0.0 {
            annualized_return / volatility
        } else {
            0.0
        };

        let downside = downside_deviation(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
        let sortino_ratio = if downside > 0.0 {
            annualized_return / downside
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&values);

        Ok(Metrics {
            final_value,
            total_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            num_days,
            returns,
        })
    }
}

fn annualize(total_return: f64, num_years: f64) -> f64 {
    if num_years <= 0.0 {
        return 0.0;
    }
    let annualized = (1.0 + total_return).powf(1.0 / num_years) - 1.0;
    if annualized.is_finite() { annualized } else { 0.0 }
}

/// Root mean square of the negative returns, over all returns.
fn downside_deviation(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = returns.iter().map(|r| r.min(0.0).powi(2)).sum();
    (sum_sq / returns.len() as f64).sqrt()
}

fn compute_drawdown(values: &[f64]) -> (f64, usize) {
    let Some(&first) = values.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for &value in values {
        if value >= peak {
            peak = value;
            current_duration = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((value - peak) / peak);
        }
        current_duration += 1;
        max_duration = max_duration.max(current_duration);
    }

    (max_dd, max_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                equity: v,
            })
            .collect()
    }

    #[test]
    fn empty_curve_is_empty_result() {
        assert!(matches!(Metrics::compute(&[], 100_000.0), Err(SimError::EmptyResult)));
    }

    #[test]
    fn total_return_positive() {
        let m = Metrics::compute(&make_equity_curve(&[100_000.0, 110_000.0, 121_000.0]), 100_000.0).unwrap();
        assert!((m.total_return - 0.21).abs() < 1e-12);
        assert!((m.final_value - 121_000.0).abs() < 1e-9);
        assert_eq!(m.num_days, 3);
        assert_eq!(m.returns.len(), 2);
        assert!((m.returns[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn total_return_negative() {
        let m = Metrics::compute(&make_equity_curve(&[100_000.0, 90_000.0]), 100_000.0).unwrap();
        assert!((m.total_return + 0.10).abs() < 1e-9);
        assert!(m.annualized_return < -0.10);
    }

    #[test]
    fn flat_year_annualizes_to_zero() {
        let m = Metrics::compute(&make_equity_curve(&[100_000.0; 252]), 100_000.0).unwrap();
        assert_eq!(m.annualized_return, 0.0);
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.max_drawdown_duration, 0);
    }

    #[test]
    fn full_year_annualized_equals_total() {
        let mut values = vec![100_000.0; 251];
        values.push(110_000.0);
        let m = Metrics::compute(&make_equity_curve(&values), 100_000.0).unwrap();
        assert!((m.annualized_return - 0.10).abs() < 1e-9);
    }

    #[test]
    fn single_point_curve() {
        let m = Metrics::compute(&make_equity_curve(&[100_000.0]), 100_000.0).unwrap();
        assert!(m.returns.is_empty());
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn max_drawdown_is_negative() {
        let (dd, _) = compute_drawdown(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert!((dd - (80.0 - 110.0) / 110.0).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_duration_counts_rows_below_peak() {
        let (_, duration) = compute_drawdown(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0, 111.0, 105.0]);
        assert_eq!(duration, 4);
    }

    #[test]
    fn monotone_curve_has_no_drawdown() {
        assert_eq!(compute_drawdown(&[1.0, 1.0, 2.0, 3.0]), (0.0, 0));
    }

    #[test]
    fn sharpe_uses_sample_volatility() {
        let values = [100.0, 102.0, 101.0, 104.0, 103.0, 106.0];
        let m = Metrics::compute(&make_equity_curve(&values), 100.0).unwrap();
        let expected_vol = sample_std(&pct_change(&values)) * TRADING_DAYS_PER_YEAR.sqrt();
        assert!((m.volatility - expected_vol).abs() < 1e-12);
        assert!((m.sharpe_ratio - m.annualized_return / expected_vol).abs() < 1e-9);
        assert!(m.sortino_ratio > 0.0);
    }
}
