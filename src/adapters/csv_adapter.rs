//! Wide CSV price adapter.
//!
//! Layout: a `date` column (`%Y-%m-%d`) followed by one close-price column
//! per ticker. Empty or non-numeric cells load as missing prices.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::error::SimError;
use crate::domain::price_table::PriceTable;
use crate::ports::price_port::PriceSource;

pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<PriceTable, SimError> {
        let file = File::open(&self.path).map_err(|e| SimError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let table = read_wide_csv(file)?;
        debug!(
            path = %self.path.display(),
            rows = table.len(),
            tickers = table.tickers().len(),
            "loaded prices"
        );
        Ok(table)
    }
}

impl PriceSource for CsvPriceSource {
    fn fetch_prices(
        &self,
        tickers: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceTable, SimError> {
        let table = self.load()?;
        let table = if tickers.is_empty() {
            table
        } else {
            table.select(tickers)?
        };
        Ok(table.filter_dates(start_date, end_date))
    }

    fn list_tickers(&self) -> Result<Vec<String>, SimError> {
        Ok(self.load()?.tickers().to_vec())
    }
}

pub fn read_wide_csv<R: Read>(reader: R) -> Result<PriceTable, SimError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    match headers.get(0) {
        Some(first) if first.eq_ignore_ascii_case("date") => {}
        _ => {
            return Err(SimError::Data {
                reason: "first column must be 'date'".into(),
            });
        }
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if tickers.is_empty() {
        return Err(SimError::Data {
            reason: "no ticker columns".into(),
        });
    }

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let date_str = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| SimError::Data {
            reason: format!("invalid date '{}': {}", date_str, e),
        })?;

        let prices = (1..=tickers.len())
            .map(|i| record.get(i).and_then(|cell| cell.parse::<f64>().ok()))
            .collect();
        rows.push((date, prices));
    }

    rows.sort_by_key(|(date, _)| *date);
    if let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(SimError::Data {
            reason: format!("duplicate date {}", pair[0].0),
        });
    }

    let (dates, rows): (Vec<NaiveDate>, Vec<Vec<Option<f64>>>) = rows.into_iter().unzip();
    PriceTable::new(dates, tickers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    const PRICES: &str = "date,AAA,BBB\n\
        2024-01-17,102.0,51.0\n\
        2024-01-15,100.0,\n\
        2024-01-16,101.0,n/a\n";

    #[test]
    fn fetch_prices_sorts_and_keeps_gaps() {
        let (_dir, path) = setup_test_data(PRICES);
        let table = CsvPriceSource::new(path).fetch_prices(&[], None, None).unwrap();

        assert_eq!(table.tickers(), ["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(table.price(0, 0), Some(100.0));
        assert_eq!(table.price(0, 1), None);
        assert_eq!(table.price(1, 1), None);
        assert_eq!(table.price(2, 1), Some(51.0));
    }

    #[test]
    fn fetch_prices_filters_tickers_and_dates() {
        let (_dir, path) = setup_test_data(PRICES);
        let source = CsvPriceSource::new(path);
        let day = NaiveDate::from_ymd_opt(2024, 1, 16);
        let table = source.fetch_prices(&["BBB".to_string()], day, None).unwrap();

        assert_eq!(table.tickers(), ["BBB".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.dates()[0], day.unwrap());
    }

    #[test]
    fn unknown_ticker_is_data_error() {
        let (_dir, path) = setup_test_data(PRICES);
        let err = CsvPriceSource::new(path)
            .fetch_prices(&["ZZZ".to_string()], None, None)
            .unwrap_err();
        assert!(matches!(err, SimError::Data { .. }));
    }

    #[test]
    fn duplicate_dates_rejected() {
        let (_dir, path) = setup_test_data("date,AAA\n2024-01-15,1\n2024-01-15,2\n");
        let err = CsvPriceSource::new(path).fetch_prices(&[], None, None).unwrap_err();
        assert!(matches!(err, SimError::Data { reason } if reason.contains("duplicate")));
    }

    #[test]
    fn bad_date_rejected() {
        let (_dir, path) = setup_test_data("date,AAA\n15/01/2024,1\n");
        assert!(CsvPriceSource::new(path).fetch_prices(&[], None, None).is_err());
    }

    #[test]
    fn missing_file_is_error() {
        let result = CsvPriceSource::new("/nonexistent/prices.csv").fetch_prices(&[], None, None);
        assert!(result.is_err());
    }

    #[test]
    fn list_tickers_and_range() {
        let (_dir, path) = setup_test_data(PRICES);
        let source = CsvPriceSource::new(path);
        assert_eq!(source.list_tickers().unwrap(), vec!["AAA", "BBB"]);
        assert_eq!(
            source.get_data_range().unwrap(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(),
                3
            ))
        );
    }

    #[test]
    fn header_only_file_has_no_range() {
        let (_dir, path) = setup_test_data("date,AAA\n");
        assert_eq!(CsvPriceSource::new(path).get_data_range().unwrap(), None);
    }
}
