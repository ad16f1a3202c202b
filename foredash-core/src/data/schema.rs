//! Expected layout of a forecast export and cell parsing.
//!
//! Headers are matched case-insensitively after trimming. Aliases from older
//! exports are accepted: `actual` for `close`, `forecast` for the model column.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::SeriesKey;

pub const DATE: &str = "date";
pub const CLOSE: &[&str] = &["close", "actual"];
pub const FORECAST_ALIAS: &str = "forecast";
pub const DAILY_SENTIMENT: &str = "daily_sentiment";
pub const WEEKLY_SENTIMENT: &str = "weekly_sentiment";

/// Column positions resolved from a record's header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    pub date: usize,
    pub close: usize,
    pub forecast: Option<usize>,
    pub daily_sentiment: Option<usize>,
    pub weekly_sentiment: Option<usize>,
}

impl RecordSchema {
    /// Resolve column positions for `key` from the header row.
    ///
    /// `date` and `close` are required; everything else is optional. The
    /// forecast column is looked up as the variant column name, then the
    /// plain `{model}_{horizon}d` name, then the `forecast` alias.
    pub fn resolve<'a>(
        headers: impl IntoIterator<Item = &'a str>,
        key: &SeriesKey,
    ) -> Result<Self, SchemaError> {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect();
        let find = |name: &str| headers.iter().position(|h| h == &name.to_ascii_lowercase());

        let date = find(DATE).ok_or_else(|| SchemaError::MissingColumn(DATE.to_string()))?;
        let close = CLOSE
            .iter()
            .find_map(|name| find(*name))
            .ok_or_else(|| SchemaError::MissingColumn(CLOSE[0].to_string()))?;
        let forecast = find(key.column_name().as_str())
            .or_else(|| find(key.source_column().as_str()))
            .or_else(|| find(FORECAST_ALIAS));

        Ok(Self {
            date,
            close,
            forecast,
            daily_sentiment: find(DAILY_SENTIMENT),
            weekly_sentiment: find(WEEKLY_SENTIMENT),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("unparseable date '{0}'")]
    BadDate(String),

    #[error("unparseable value '{value}' in column {column}")]
    BadValue { column: String, value: String },
}

/// Parse a date cell: `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date(cell: &str) -> Result<NaiveDate, SchemaError> {
    let cell = cell.trim();
    if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return Ok(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .map(|dt| dt.date())
        .ok_or_else(|| SchemaError::BadDate(cell.to_string()))
}

/// Parse a numeric cell. Empty and NaN-like cells are absent, not errors.
pub fn parse_value(cell: &str, column: &str) -> Result<Option<f64>, SchemaError> {
    let cell = cell.trim();
    if cell.is_empty()
        || ["nan", "na", "null", "none"]
            .iter()
            .any(|missing| cell.eq_ignore_ascii_case(missing))
    {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| SchemaError::BadValue {
            column: column.to_string(),
            value: cell.to_string(),
        })
}
