//! Price data port.

use crate::domain::error::SimError;
use crate::domain::price_table::PriceTable;
use chrono::NaiveDate;

pub trait PriceSource {
    /// Loads the price table, keeping only `tickers` (all when empty) and
    /// dates within the inclusive range.
    fn fetch_prices(
        &self,
        tickers: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceTable, SimError>;

    fn list_tickers(&self) -> Result<Vec<String>, SimError>;

    /// First date, last date and row count, or `None` when there is no data.
    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SimError> {
        let table = self.fetch_prices(&[], None, None)?;
        Ok(match (table.dates().first(), table.dates().last()) {
            (Some(first), Some(last)) => Some((*first, *last, table.len())),
            _ => None,
        })
    }
}
