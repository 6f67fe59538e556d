//! JSON result documents.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::{Comparison, StrategyFailure, SummaryRow};
use crate::domain::error::SimError;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct ComparisonDocument<'a> {
    summary: Vec<SummaryRow>,
    failures: Vec<StrategyFailure>,
    results: Vec<&'a BacktestResult>,
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    fn write_pretty<T: Serialize>(value: &T, output_path: &Path) -> Result<(), SimError> {
        let mut writer = BufWriter::new(File::create(output_path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SimError> {
        Self::write_pretty(result, output_path)
    }

    fn write_comparison(&self, comparison: &Comparison, output_path: &Path) -> Result<(), SimError> {
        let document = ComparisonDocument {
            summary: comparison.summary(),
            failures: comparison.failures(),
            results: comparison.successes().collect(),
        };
        Self::write_pretty(&document, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{Backtester, RunConfig};
    use crate::domain::comparison::compare;
    use crate::domain::price_table::PriceTable;
    use crate::domain::strategy::{BuyAndHold, Momentum};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn table() -> PriceTable {
        let dates = (0..3)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect();
        PriceTable::from_columns(dates, vec![("AAA".to_string(), vec![100.0, 110.0, 121.0])]).unwrap()
    }

    #[test]
    fn writes_result_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        let result = Backtester::new(RunConfig::default())
            .run(&table(), &BuyAndHold::default())
            .unwrap();

        JsonReportAdapter.write(&result, &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["strategy"], "buy_and_hold");
        assert_eq!(json["equity_curve"].as_array().unwrap().len(), 3);
        assert_eq!(json["equity_curve"][2]["date"], "2024-01-03");
        assert_eq!(json["skipped_trades"], 0);
    }

    #[test]
    fn writes_comparison_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compare.json");
        let cmp = compare(
            &table(),
            &RunConfig::default(),
            &[BuyAndHold::default().into(), Momentum::new(1, 1).into()],
        );

        JsonReportAdapter.write_comparison(&cmp, &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"].as_array().unwrap().len(), 2);
        assert_eq!(json["summary"][1]["strategy"], "momentum");
        assert!(json["failures"].as_array().unwrap().is_empty());
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let result = Backtester::new(RunConfig::default())
            .run(&table(), &BuyAndHold::default())
            .unwrap();
        let err = JsonReportAdapter
            .write(&result, Path::new("/nonexistent/dir/result.json"))
            .unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
