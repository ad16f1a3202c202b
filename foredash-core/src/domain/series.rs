//! Series keys and records: one forecast export per (ticker, model, horizon, variant).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Whether a forecast comes from the base or the tuned version of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Base,
    Tuned,
}

impl Variant {
    /// Both variants, in the order the catalog requests them.
    pub const ALL: [Variant; 2] = [Variant::Base, Variant::Tuned];

    /// Column/file suffix for this variant (`""` or `"_tuned"`).
    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Base => "",
            Variant::Tuned => "_tuned",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Base => write!(f, "base"),
            Variant::Tuned => write!(f, "tuned"),
        }
    }
}

/// Identity of one forecast series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub ticker: String,
    pub model: String,
    pub horizon: u32,
    pub variant: Variant,
}

impl SeriesKey {
    pub fn new(ticker: impl Into<String>, model: impl Into<String>, horizon: u32, variant: Variant) -> Self {
        Self {
            ticker: ticker.into(),
            model: model.into(),
            horizon,
            variant,
        }
    }

    /// Column name in the aligned table: `{model}_{horizon}d` or `{model}_{horizon}d_tuned`.
    pub fn column_name(&self) -> String {
        format!("{}{}", self.source_column(), self.variant.suffix())
    }

    /// Forecast column name as written in the export file (variant-independent).
    pub fn source_column(&self) -> String {
        format!("{}_{}d", self.model, self.horizon)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ticker, self.column_name())
    }
}

/// One dated row of a forecast export. Every value is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub forecast: Option<f64>,
    pub daily_sentiment: Option<f64>,
    pub weekly_sentiment: Option<f64>,
}

impl SeriesRow {
    /// A row with only a date; fill fields with struct update syntax.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            close: None,
            forecast: None,
            daily_sentiment: None,
            weekly_sentiment: None,
        }
    }
}

/// A parsed forecast export for one [`SeriesKey`].
///
/// Construction enforces the record invariants: dates are unique (first
/// occurrence wins) and rows are held in ascending date order.
///
/// A record may declare a forecast column whose cells are all absent; that
/// column still appears in the aligned table.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesRecord {
    key: SeriesKey,
    rows: Vec<SeriesRow>,
    forecast_column: bool,
}

impl SeriesRecord {
    pub fn new(key: SeriesKey, rows: Vec<SeriesRow>) -> Self {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut rows: Vec<SeriesRow> = rows.into_iter().filter(|r| seen.insert(r.date)).collect();
        rows.sort_by_key(|r| r.date);
        let forecast_column = rows.iter().any(|r| r.forecast.is_some());
        Self {
            key,
            rows,
            forecast_column,
        }
    }

    /// Mark whether the source declared a forecast column. A record with a
    /// present forecast value always has one.
    pub fn with_forecast_column(mut self, declared: bool) -> Self {
        self.forecast_column = declared || self.has_forecast();
        self
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    pub fn has_forecast(&self) -> bool {
        self.rows.iter().any(|r| r.forecast.is_some())
    }

    /// Whether this record contributes a forecast column, present values or not.
    pub fn has_forecast_column(&self) -> bool {
        self.forecast_column
    }

    pub fn has_daily_sentiment(&self) -> bool {
        self.rows.iter().any(|r| r.daily_sentiment.is_some())
    }

    pub fn has_weekly_sentiment(&self) -> bool {
        self.rows.iter().any(|r| r.weekly_sentiment.is_some())
    }

    /// Number of rows with a present close price.
    pub fn close_count(&self) -> usize {
        self.rows.iter().filter(|r| r.close.is_some()).count()
    }

    /// `(date, value)` pairs for the forecast column, absent values skipped.
    pub fn forecast_points(&self) -> Vec<(NaiveDate, f64)> {
        self.points(|r| r.forecast)
    }

    pub fn daily_sentiment_points(&self) -> Vec<(NaiveDate, f64)> {
        self.points(|r| r.daily_sentiment)
    }

    pub fn weekly_sentiment_points(&self) -> Vec<(NaiveDate, f64)> {
        self.points(|r| r.weekly_sentiment)
    }

    fn points(&self, field: impl Fn(&SeriesRow) -> Option<f64>) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|r| field(r).map(|v| (r.date, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn column_names_follow_variant() {
        let base = SeriesKey::new("AAPL", "lstm", 3, Variant::Base);
        let tuned = SeriesKey::new("AAPL", "lstm", 3, Variant::Tuned);
        assert_eq!(base.column_name(), "lstm_3d");
        assert_eq!(tuned.column_name(), "lstm_3d_tuned");
        assert_eq!(tuned.source_column(), "lstm_3d");
    }

    #[test]
    fn duplicate_dates_keep_first_occurrence() {
        let key = SeriesKey::new("AAPL", "arima", 1, Variant::Base);
        let rows = vec![
            SeriesRow { close: Some(1.0), ..SeriesRow::empty(d(2)) },
            SeriesRow { close: Some(2.0), ..SeriesRow::empty(d(2)) },
            SeriesRow { close: Some(3.0), ..SeriesRow::empty(d(3)) },
        ];
        let record = SeriesRecord::new(key, rows);
        assert_eq!(record.len(), 2);
        assert_eq!(record.rows()[0].close, Some(1.0));
    }

    #[test]
    fn rows_are_sorted_by_date() {
        let key = SeriesKey::new("AAPL", "arima", 1, Variant::Base);
        let rows = vec![
            SeriesRow::empty(d(5)),
            SeriesRow::empty(d(1)),
            SeriesRow::empty(d(3)),
        ];
        let record = SeriesRecord::new(key, rows);
        let dates: Vec<_> = record.dates().collect();
        assert_eq!(dates, vec![d(1), d(3), d(5)]);
    }

    #[test]
    fn carried_fields_require_a_present_value() {
        let key = SeriesKey::new("TSLA", "xgboost", 7, Variant::Base);
        let rows = vec![
            SeriesRow { close: Some(1.0), ..SeriesRow::empty(d(1)) },
            SeriesRow { weekly_sentiment: Some(0.2), ..SeriesRow::empty(d(2)) },
        ];
        let record = SeriesRecord::new(key, rows);
        assert!(!record.has_forecast());
        assert!(!record.has_forecast_column());
        assert!(!record.has_daily_sentiment());
        assert!(record.has_weekly_sentiment());
        assert_eq!(record.close_count(), 1);
    }

    #[test]
    fn declared_forecast_column_survives_without_values() {
        let key = SeriesKey::new("AAPL", "lstm", 1, Variant::Base);
        let rows = vec![SeriesRow { close: Some(1.0), ..SeriesRow::empty(d(1)) }];
        let declared = SeriesRecord::new(key.clone(), rows.clone()).with_forecast_column(true);
        assert!(declared.has_forecast_column());
        assert!(!declared.has_forecast());

        let with_value = vec![SeriesRow { forecast: Some(2.0), ..SeriesRow::empty(d(1)) }];
        let record = SeriesRecord::new(key, with_value).with_forecast_column(false);
        assert!(record.has_forecast_column());
    }
}
