#![allow(dead_code)]

use chrono::NaiveDate;
use simtrader::domain::backtest::BacktestResult;
use simtrader::domain::comparison::Comparison;
use simtrader::domain::error::SimError;
use simtrader::domain::price_table::PriceTable;
use simtrader::ports::price_port::PriceSource;
use simtrader::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct MockPriceSource {
    pub table: PriceTable,
    pub error: Option<String>,
}

impl MockPriceSource {
    pub fn new(table: PriceTable) -> Self {
        Self { table, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            table: PriceTable::empty(vec![]),
            error: Some(reason.to_string()),
        }
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_prices(
        &self,
        tickers: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceTable, SimError> {
        if let Some(reason) = &self.error {
            return Err(SimError::Data {
                reason: reason.clone(),
            });
        }
        let table = if tickers.is_empty() {
            self.table.clone()
        } else {
            self.table.select(tickers)?
        };
        Ok(table.filter_dates(start_date, end_date))
    }

    fn list_tickers(&self) -> Result<Vec<String>, SimError> {
        Ok(self.table.tickers().to_vec())
    }
}

/// Captures what a report adapter was asked to write.
#[derive(Default)]
pub struct MockReportPort {
    pub written: RefCell<Vec<(String, PathBuf)>>,
}

impl ReportPort for MockReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SimError> {
        self.written
            .borrow_mut()
            .push((result.strategy.clone(), output_path.to_path_buf()));
        Ok(())
    }

    fn write_comparison(&self, comparison: &Comparison, output_path: &Path) -> Result<(), SimError> {
        for row in comparison.summary() {
            self.written
                .borrow_mut()
                .push((row.strategy, output_path.to_path_buf()));
        }
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar dates starting at `start`.
pub fn dates_from(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

/// Dense table of daily series starting 2024-01-01.
pub fn make_table(columns: &[(&str, Vec<f64>)]) -> PriceTable {
    let len = columns.first().map(|(_, s)| s.len()).unwrap_or(0);
    PriceTable::from_columns(
        dates_from(date(2024, 1, 1), len),
        columns
            .iter()
            .map(|(t, s)| (t.to_string(), s.clone()))
            .collect(),
    )
    .unwrap()
}

/// Deterministic zig-zag series around a drift, for multi-ticker runs.
pub fn generate_series(count: usize, start_price: f64, drift: f64, swing: f64) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let wobble = if i % 2 == 0 { swing } else { -swing };
            start_price * (1.0 + drift).powi(i as i32) + wobble
        })
        .collect()
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
