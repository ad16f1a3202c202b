//! Domain types for the forecast dashboard

pub mod series;
pub mod table;

pub use series::{SeriesKey, SeriesRecord, SeriesRow, Variant};
pub use table::{
    AlignedTable, Column, ColumnKind, SentimentSource, TableError, ACTUAL_CLOSE, SENTIMENT,
};
