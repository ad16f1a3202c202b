//! Truncation: drop trailing rows where no forecast column has a value.

use chrono::NaiveDate;

use crate::domain::AlignedTable;

/// Last date at which any forecast column holds a present value.
pub fn max_forecast_date(table: &AlignedTable) -> Option<NaiveDate> {
    table
        .forecast_columns()
        .filter_map(|c| c.last_present_index())
        .max()
        .map(|idx| table.dates()[idx])
}

/// Clip the table to `date <= max_forecast_date`.
///
/// With no present forecast value anywhere the table is returned whole, so
/// an actual-price-only view still renders.
pub fn truncate(table: AlignedTable) -> AlignedTable {
    match max_forecast_date(&table) {
        Some(last) if Some(&last) != table.dates().last() => table.through(last),
        _ => table,
    }
}
