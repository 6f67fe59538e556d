//! Date-indexed price table with one column per ticker.
//!
//! Cells are optional: a missing or unusable quote is a per-ticker,
//! per-date `MissingPrice`, never a table-level error.

use chrono::NaiveDate;
use std::collections::HashSet;

use super::error::SimError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

/// Borrowed view of a single date's prices.
#[derive(Debug, Clone, Copy)]
pub struct PriceRow<'a> {
    pub date: NaiveDate,
    tickers: &'a [String],
    prices: &'a [Option<f64>],
}

/// A quote is usable only when it is finite and strictly positive.
pub fn usable_price(value: Option<f64>) -> Option<f64> {
    value.filter(|p| p.is_finite() && *p > 0.0)
}

impl PriceTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, SimError> {
        if dates.len() != rows.len() {
            return Err(SimError::Data {
                reason: format!("{} dates but {} rows", dates.len(), rows.len()),
            });
        }

        let mut seen = HashSet::new();
        for ticker in &tickers {
            if !seen.insert(ticker.as_str()) {
                return Err(SimError::Data {
                    reason: format!("duplicate ticker column: {ticker}"),
                });
            }
        }

        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SimError::Data {
                    reason: format!(
                        "dates must be strictly ascending: {} follows {}",
                        pair[1], pair[0]
                    ),
                });
            }
        }

        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != tickers.len())
        {
            return Err(SimError::Data {
                reason: format!(
                    "row {} ({}) has {} values, expected {}",
                    i,
                    dates[i],
                    row.len(),
                    tickers.len()
                ),
            });
        }

        Ok(PriceTable {
            dates,
            tickers,
            rows,
        })
    }

    /// Builds a table from dense per-ticker series; every series must be as
    /// long as `dates`.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, SimError> {
        if let Some((ticker, series)) = columns.iter().find(|(_, s)| s.len() != dates.len()) {
            return Err(SimError::Data {
                reason: format!(
                    "column {} has {} values, expected {}",
                    ticker,
                    series.len(),
                    dates.len()
                ),
            });
        }
        let rows = (0..dates.len())
            .map(|i| columns.iter().map(|(_, s)| Some(s[i])).collect())
            .collect();
        let tickers = columns.into_iter().map(|(t, _)| t).collect();
        PriceTable::new(dates, tickers, rows)
    }

    pub fn empty(tickers: Vec<String>) -> Self {
        PriceTable {
            dates: Vec::new(),
            tickers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn ticker_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Raw cell value, including unusable quotes.
    pub fn raw(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Usable price at `(row, col)`.
    pub fn price(&self, row: usize, col: usize) -> Option<f64> {
        usable_price(self.raw(row, col))
    }

    pub fn row(&self, index: usize) -> PriceRow<'_> {
        PriceRow {
            date: self.dates[index],
            tickers: &self.tickers,
            prices: &self.rows[index],
        }
    }

    /// Inclusive date-range filter; row order is preserved.
    pub fn filter_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceTable {
        let keep = |d: &NaiveDate| start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e);

        let (dates, rows) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(d, _)| keep(d))
            .map(|(d, r)| (*d, r.clone()))
            .unzip();

        PriceTable {
            dates,
            tickers: self.tickers.clone(),
            rows,
        }
    }

    /// Keeps only the named tickers, in the order given.
    pub fn select(&self, tickers: &[String]) -> Result<PriceTable, SimError> {
        let indices = tickers
            .iter()
            .map(|t| {
                self.ticker_index(t).ok_or_else(|| SimError::Data {
                    reason: format!("unknown ticker: {t}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i]).collect())
            .collect();

        PriceTable::new(self.dates.clone(), tickers.to_vec(), rows)
    }
}

impl<'a> PriceRow<'a> {
    /// Usable price for `ticker` on this row.
    pub fn price(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .and_then(|i| usable_price(self.prices[i]))
    }
}
