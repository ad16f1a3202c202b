//! Series loader trait and structured error types.
//!
//! The SeriesLoader trait abstracts over where forecast exports come from
//! (a CSV export directory, records already held in memory) so the engine
//! can be driven from files in the CLI and from fixtures in tests.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{SeriesKey, SeriesRecord};

/// Structured error types for loading a single record.
///
/// A missing source is not an error: loaders return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed record '{origin}': {reason}")]
    MalformedRecord { origin: String, reason: String },

    #[error("failed to read '{path}': {reason}")]
    Io { path: String, reason: String },
}

impl DataError {
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

/// Dated sentiment values from a standalone per-ticker trend export.
pub type SentimentTrend = Vec<(NaiveDate, f64)>;

/// Trait for record sources.
///
/// Implementations perform all I/O; the engine only sees materialized records.
pub trait SeriesLoader: Send + Sync {
    /// Human-readable name of this loader.
    fn name(&self) -> &str;

    /// Load the record for one series key, or `Ok(None)` when no source exists.
    fn load(&self, key: &SeriesKey) -> Result<Option<SeriesRecord>, DataError>;

    /// Load the standalone sentiment trend for a ticker, if the source has one.
    fn load_sentiment_trend(&self, _ticker: &str) -> Result<Option<SentimentTrend>, DataError> {
        Ok(None)
    }
}

/// Loader over records already held in memory.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    records: HashMap<SeriesKey, SeriesRecord>,
    trends: HashMap<String, SentimentTrend>,
    failures: HashMap<SeriesKey, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SeriesRecord>) -> Self {
        let mut loader = Self::new();
        for record in records {
            loader.insert(record);
        }
        loader
    }

    /// Add a record; replaces any existing record with the same key.
    pub fn insert(&mut self, record: SeriesRecord) {
        self.records.insert(record.key().clone(), record);
    }

    pub fn insert_trend(&mut self, ticker: impl Into<String>, trend: SentimentTrend) {
        self.trends.insert(ticker.into(), trend);
    }

    /// Make `load(key)` fail with a malformed-record error.
    pub fn insert_malformed(&mut self, key: SeriesKey, reason: impl Into<String>) {
        self.failures.insert(key, reason.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SeriesLoader for MemoryLoader {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, key: &SeriesKey) -> Result<Option<SeriesRecord>, DataError> {
        if let Some(reason) = self.failures.get(key) {
            return Err(DataError::malformed(key.to_string(), reason.clone()));
        }
        Ok(self.records.get(key).cloned())
    }

    fn load_sentiment_trend(&self, ticker: &str) -> Result<Option<SentimentTrend>, DataError> {
        Ok(self.trends.get(ticker).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SeriesRow, Variant};

    fn record(model: &str) -> SeriesRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        SeriesRecord::new(
            SeriesKey::new("AAPL", model, 1, Variant::Base),
            vec![SeriesRow {
                close: Some(100.0),
                ..SeriesRow::empty(date)
            }],
        )
    }

    #[test]
    fn missing_key_is_not_an_error() {
        let loader = MemoryLoader::with_records([record("lstm")]);
        let key = SeriesKey::new("AAPL", "arima", 1, Variant::Base);
        assert!(loader.load(&key).unwrap().is_none());
    }

    #[test]
    fn present_key_returns_record() {
        let loader = MemoryLoader::with_records([record("lstm")]);
        let key = SeriesKey::new("AAPL", "lstm", 1, Variant::Base);
        let loaded = loader.load(&key).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn injected_failure_is_malformed() {
        let mut loader = MemoryLoader::new();
        let key = SeriesKey::new("AAPL", "lstm", 1, Variant::Tuned);
        loader.insert_malformed(key.clone(), "no date column");
        let err = loader.load(&key).unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { .. }));
        assert!(err.to_string().contains("no date column"));
    }

    #[test]
    fn trend_defaults_to_none() {
        let loader = MemoryLoader::new();
        assert!(loader.load_sentiment_trend("AAPL").unwrap().is_none());
    }
}
