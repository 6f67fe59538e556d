//! Report output port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::Comparison;
use crate::domain::error::SimError;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SimError>;

    fn write_comparison(&self, comparison: &Comparison, output_path: &Path) -> Result<(), SimError>;
}
