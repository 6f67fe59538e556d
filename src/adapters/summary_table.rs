//! Comparison summary as CSV and as an aligned terminal table.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::{Comparison, SummaryRow};
use crate::domain::error::SimError;
use crate::ports::report_port::ReportPort;

const HEADERS: [&str; 7] = [
    "strategy",
    "total_return%",
    "annualized_return%",
    "volatility%",
    "sharpe_ratio",
    "max_drawdown%",
    "num_trades",
];

pub struct SummaryTableAdapter;

impl SummaryTableAdapter {
    fn write_rows(rows: &[SummaryRow], output_path: &Path) -> Result<(), SimError> {
        let mut wtr = csv::Writer::from_path(output_path)?;
        wtr.write_record(HEADERS)?;
        for row in rows {
            wtr.write_record(cells(row))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Column-aligned plain text table, one line per row.
    pub fn render(rows: &[SummaryRow]) -> String {
        let body: Vec<[String; 7]> = rows.iter().map(cells).collect();

        let mut widths = HEADERS.map(str::len);
        for cells in &body {
            for (w, cell) in widths.iter_mut().zip(cells) {
                *w = (*w).max(cell.len());
            }
        }

        let mut out = String::new();
        let header = HEADERS.map(str::to_string);
        for cells in std::iter::once(&header).chain(&body) {
            let line: Vec<String> = cells
                .iter()
                .zip(widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == 0 {
                        format!("{cell:<w$}")
                    } else {
                        format!("{cell:>w$}")
                    }
                })
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

fn cells(row: &SummaryRow) -> [String; 7] {
    [
        row.strategy.clone(),
        format!("{:.2}", row.total_return_pct),
        format!("{:.2}", row.annualized_return_pct),
        format!("{:.2}", row.volatility_pct),
        format!("{:.3}", row.sharpe_ratio),
        format!("{:.2}", row.max_drawdown_pct),
        row.num_trades.to_string(),
    ]
}

impl ReportPort for SummaryTableAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SimError> {
        Self::write_rows(&[SummaryRow::from(result)], output_path)
    }

    fn write_comparison(&self, comparison: &Comparison, output_path: &Path) -> Result<(), SimError> {
        Self::write_rows(&comparison.summary(), output_path)
    }
}
