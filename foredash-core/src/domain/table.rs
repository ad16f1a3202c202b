//! AlignedTable: the date-indexed view handed to the rendering layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::series::SeriesKey;

/// Column name of the baseline close price.
pub const ACTUAL_CLOSE: &str = "actual_close";

/// Column name of the selected sentiment series.
pub const SENTIMENT: &str = "sentiment";

/// Where the sentiment column came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    Daily,
    Weekly,
    /// Standalone per-ticker trend export, used only when no record carries sentiment.
    Trend,
}

/// Role of a column in the aligned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    ActualClose,
    Forecast { key: SeriesKey },
    Sentiment { source: SentimentSource },
}

/// A named column, one value-or-absent per table date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self.kind, ColumnKind::Forecast { .. })
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Index of the last present value, if any.
    pub fn last_present_index(&self) -> Option<usize> {
        self.values.iter().rposition(|v| v.is_some())
    }

    fn truncated(&self, len: usize) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            values: self.values[..len].to_vec(),
        }
    }
}

/// A deserialized table that breaks an [`AlignedTable`] invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("first column must be actual_close")]
    MissingActualClose,

    #[error("dates are not strictly increasing at index {0}")]
    UnorderedDates(usize),

    #[error("column '{name}' has {len} values for {expected} dates")]
    ColumnLength {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// Serialized shape of an [`AlignedTable`], checked before conversion.
#[derive(Deserialize)]
struct RawTable {
    ticker: String,
    title: String,
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl TryFrom<RawTable> for AlignedTable {
    type Error = TableError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        match raw.columns.first() {
            Some(first) if first.kind == ColumnKind::ActualClose => {}
            _ => return Err(TableError::MissingActualClose),
        }
        if let Some(i) = raw.dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(TableError::UnorderedDates(i + 1));
        }
        let mut names = HashSet::with_capacity(raw.columns.len());
        for column in &raw.columns {
            if column.values.len() != raw.dates.len() {
                return Err(TableError::ColumnLength {
                    name: column.name.clone(),
                    len: column.values.len(),
                    expected: raw.dates.len(),
                });
            }
            if !names.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self {
            ticker: raw.ticker,
            title: raw.title,
            dates: raw.dates,
            columns: raw.columns,
        })
    }
}

/// Date-indexed table: baseline dates plus named columns.
///
/// Invariants (also enforced on deserialization):
/// - `dates` is strictly increasing.
/// - every column has exactly `dates.len()` values.
/// - column names are unique; `actual_close` is always first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct AlignedTable {
    ticker: String,
    title: String,
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl AlignedTable {
    /// Start a table from the baseline index and its close prices.
    pub(crate) fn with_baseline(
        ticker: impl Into<String>,
        dates: Vec<NaiveDate>,
        actual_close: Vec<Option<f64>>,
    ) -> Self {
        debug_assert_eq!(dates.len(), actual_close.len());
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        let ticker = ticker.into();
        Self {
            title: format!("{ticker} forecasts"),
            ticker,
            dates,
            columns: vec![Column::new(ACTUAL_CLOSE, ColumnKind::ActualClose, actual_close)],
        }
    }

    pub(crate) fn push_column(&mut self, column: Column) {
        debug_assert_eq!(column.values.len(), self.dates.len());
        debug_assert!(self.column(column.name()).is_none());
        self.columns.push(column);
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Display title for the chart above this table.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn actual_close(&self) -> &Column {
        // Always present: inserted by `with_baseline` and never removed.
        &self.columns[0]
    }

    pub fn forecast_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_forecast())
    }

    pub fn sentiment(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| matches!(c.kind, ColumnKind::Sentiment { .. }))
    }

    /// Value of column `name` at `date`; `None` when the date, the column, or the value is absent.
    pub fn value(&self, name: &str, date: NaiveDate) -> Option<f64> {
        let idx = self.dates.binary_search(&date).ok()?;
        self.column(name)?.values[idx]
    }

    /// Copy of this table keeping only rows with `date <= last`.
    pub fn through(&self, last: NaiveDate) -> Self {
        let len = self.dates.partition_point(|d| *d <= last);
        Self {
            ticker: self.ticker.clone(),
            title: self.title.clone(),
            dates: self.dates[..len].to_vec(),
            columns: self.columns.iter().map(|c| c.truncated(len)).collect(),
        }
    }

    /// BLAKE3 hash over dates, column names, and values.
    ///
    /// Column order is part of the hash, so two tables with the same content
    /// in the same layout hash identically.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.ticker.as_bytes());
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        for column in &self.columns {
            hasher.update(column.name.as_bytes());
            for value in &column.values {
                match value {
                    Some(v) => {
                        hasher.update(&[1]);
                        hasher.update(&v.to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
