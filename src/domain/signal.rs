//! Signal matrices and the rebalance calendar.
//!
//! A [`SignalMatrix`] is dates × tickers. `0.0` is the default and means
//! "no action". How a non-zero value is executed depends on [`SignalKind`].

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::price_table::PriceTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Positive value = fraction of current cash to spend on the ticker;
    /// negative value = liquidate the ticker.
    CashFraction,
    /// Values are target portfolio weights. A row with any non-zero value is
    /// a rebalance; an all-zero row is no action.
    TargetWeight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatrix {
    pub kind: SignalKind,
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalRow<'a> {
    pub date: NaiveDate,
    tickers: &'a [String],
    values: &'a [f64],
}

impl SignalMatrix {
    /// All-zero matrix shaped like `table`.
    pub fn zeros(table: &PriceTable, kind: SignalKind) -> Self {
        SignalMatrix {
            kind,
            dates: table.dates().to_vec(),
            tickers: table.tickers().to_vec(),
            values: vec![vec![0.0; table.tickers().len()]; table.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row][col] = value;
    }

    /// Overwrite a whole row; `weights` is aligned with [`Self::tickers`].
    pub fn set_row(&mut self, row: usize, weights: &[f64]) {
        self.values[row].copy_from_slice(weights);
    }

    pub fn row(&self, index: usize) -> SignalRow<'_> {
        SignalRow {
            date: self.dates[index],
            tickers: &self.tickers,
            values: &self.values[index],
        }
    }

    /// Indices of rows carrying at least one non-zero signal.
    pub fn active_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.row(i).is_active()).collect()
    }
}

impl<'a> SignalRow<'a> {
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let (tickers, values) = (self.tickers, self.values);
        tickers
            .iter()
            .zip(values.iter())
            .map(|(t, v)| (t.as_str(), *v))
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.values[i])
    }

    pub fn is_active(&self) -> bool {
        self.values.iter().any(|v| *v != 0.0)
    }
}

/// Anything that turns a price table into a signal matrix.
pub trait SignalGenerator {
    fn name(&self) -> &str;

    fn generate(&self, prices: &PriceTable) -> SignalMatrix;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

/// Rows between weekly rebalances.
pub const WEEKLY_ROW_INTERVAL: usize = 5;

impl RebalanceFrequency {
    /// Whether row `index` of `dates` is a rebalance date.
    ///
    /// Weekly counts rows, not calendar weeks. Monthly and quarterly pick the
    /// last row of each period; the final row qualifies only if it is also
    /// the calendar end of its period.
    pub fn is_rebalance_date(&self, dates: &[NaiveDate], index: usize) -> bool {
        match self {
            RebalanceFrequency::Daily => true,
            RebalanceFrequency::Weekly => index % WEEKLY_ROW_INTERVAL == 0,
            RebalanceFrequency::Monthly => is_period_end(dates, index, month_key),
            RebalanceFrequency::Quarterly => is_period_end(dates, index, quarter_key),
        }
    }

    /// All rebalance row indices for `dates`.
    pub fn schedule(&self, dates: &[NaiveDate]) -> Vec<usize> {
        (0..dates.len())
            .filter(|&i| self.is_rebalance_date(dates, i))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RebalanceFrequency::Daily => "daily",
            RebalanceFrequency::Weekly => "weekly",
            RebalanceFrequency::Monthly => "monthly",
            RebalanceFrequency::Quarterly => "quarterly",
        }
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

fn quarter_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month0() / 3)
}

fn is_period_end(dates: &[NaiveDate], index: usize, key: fn(NaiveDate) -> (i32, u32)) -> bool {
    let current = dates[index];
    let next = match dates.get(index + 1) {
        Some(next) => *next,
        None => match current.succ_opt() {
            Some(next) => next,
            None => return true,
        },
    };
    key(current) != key(next)
}

impl FromStr for RebalanceFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RebalanceFrequency::Daily),
            "weekly" => Ok(RebalanceFrequency::Weekly),
            "monthly" => Ok(RebalanceFrequency::Monthly),
            "quarterly" => Ok(RebalanceFrequency::Quarterly),
            other => Err(format!(
                "unknown rebalance frequency '{other}' (expected daily, weekly, monthly or quarterly)"
            )),
        }
    }
}

impl fmt::Display for RebalanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
