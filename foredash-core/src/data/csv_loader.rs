//! CSV export directory loader.
//!
//! Layout: `{data_dir}/{TICKER}_{model}_{horizon}d[_full][_tuned].csv`
//!
//! Plus one optional `{data_dir}/{TICKER}_sentiment_trend.csv` per ticker
//! holding a date column and a single sentiment value column.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::provider::{DataError, SentimentTrend, SeriesLoader};
use super::schema::{self, parse_date, parse_value, RecordSchema, SchemaError};
use crate::domain::{SeriesKey, SeriesRecord, SeriesRow, Variant};

const FULL_SUFFIX: &str = "_full";

/// Loader reading forecast exports from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvDirLoader {
    data_dir: PathBuf,
    prefer_full: bool,
}

impl CsvDirLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            prefer_full: true,
        }
    }

    /// Whether `_full` exports are tried before plain ones (default: true).
    ///
    /// Either way the other file is used as a fallback.
    pub fn prefer_full(mut self, prefer_full: bool) -> Self {
        self.prefer_full = prefer_full;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Candidate paths for a key, most preferred first.
    pub fn candidate_paths(&self, key: &SeriesKey) -> Vec<PathBuf> {
        let stem = format!("{}_{}_{}d", key.ticker, key.model, key.horizon);
        let suffix = key.variant.suffix();
        let full = self.data_dir.join(format!("{stem}{FULL_SUFFIX}{suffix}.csv"));
        let plain = self.data_dir.join(format!("{stem}{suffix}.csv"));
        if self.prefer_full {
            vec![full, plain]
        } else {
            vec![plain, full]
        }
    }

    /// Path of the standalone sentiment trend export for a ticker.
    pub fn trend_path(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{ticker}_sentiment_trend.csv"))
    }

    /// List the series keys that have an export file for `ticker`, sorted.
    ///
    /// `_full` and plain files for the same key are reported once.
    pub fn discover(&self, ticker: &str) -> Result<Vec<SeriesKey>, DataError> {
        let entries = std::fs::read_dir(&self.data_dir).map_err(|e| DataError::Io {
            path: self.data_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(parse_file_name) {
                if key.ticker == ticker && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl SeriesLoader for CsvDirLoader {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, key: &SeriesKey) -> Result<Option<SeriesRecord>, DataError> {
        let Some(path) = self.candidate_paths(key).into_iter().find(|p| p.is_file()) else {
            return Ok(None);
        };
        debug!(key = %key, path = %path.display(), "reading forecast export");
        read_record(&path, key).map(Some)
    }

    fn load_sentiment_trend(&self, ticker: &str) -> Result<Option<SentimentTrend>, DataError> {
        let path = self.trend_path(ticker);
        if !path.is_file() {
            return Ok(None);
        }
        debug!(ticker, path = %path.display(), "reading sentiment trend");
        read_trend(&path).map(Some)
    }
}

/// Parse a forecast export file name back into a series key.
///
/// Returns `None` for anything that is not `{TICKER}_{model}_{N}d[_full][_tuned].csv`.
pub fn parse_file_name(name: &str) -> Option<SeriesKey> {
    let stem = name.strip_suffix(".csv")?;
    let (stem, variant) = match stem.strip_suffix(Variant::Tuned.suffix()) {
        Some(rest) => (rest, Variant::Tuned),
        None => (stem, Variant::Base),
    };
    let stem = stem.strip_suffix(FULL_SUFFIX).unwrap_or(stem);

    let (head, horizon) = stem.rsplit_once('_')?;
    let horizon: u32 = horizon.strip_suffix('d')?.parse().ok()?;
    let (ticker, model) = head.split_once('_')?;
    if ticker.is_empty() || model.is_empty() || horizon == 0 {
        return None;
    }
    Some(SeriesKey::new(ticker, model, horizon, variant))
}

fn io_error(path: &Path, err: impl std::fmt::Display) -> DataError {
    DataError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn csv_error(path: &Path, err: csv::Error) -> DataError {
    if err.is_io_error() {
        io_error(path, err)
    } else {
        DataError::malformed(path.display().to_string(), err.to_string())
    }
}

fn schema_error(path: &Path, line: usize, err: SchemaError) -> DataError {
    DataError::malformed(path.display().to_string(), format!("line {line}: {err}"))
}

/// Read one forecast export into a record.
pub fn read_record(path: &Path, key: &SeriesKey) -> Result<SeriesRecord, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let layout = RecordSchema::resolve(headers.iter(), key).map_err(|e| schema_error(path, 1, e))?;

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let record = result.map_err(|e| csv_error(path, e))?;
        let row = parse_row(&record, &layout, key).map_err(|e| schema_error(path, line, e))?;
        rows.push(row);
    }

    Ok(SeriesRecord::new(key.clone(), rows).with_forecast_column(layout.forecast.is_some()))
}

fn parse_row(
    record: &csv::StringRecord,
    layout: &RecordSchema,
    key: &SeriesKey,
) -> Result<SeriesRow, SchemaError> {
    let cell = |idx: usize| record.get(idx).unwrap_or("");
    let optional = |idx: Option<usize>, column: &str| match idx {
        Some(idx) => parse_value(cell(idx), column),
        None => Ok(None),
    };

    Ok(SeriesRow {
        date: parse_date(cell(layout.date))?,
        close: parse_value(cell(layout.close), schema::CLOSE[0])?,
        forecast: optional(layout.forecast, &key.column_name())?,
        daily_sentiment: optional(layout.daily_sentiment, schema::DAILY_SENTIMENT)?,
        weekly_sentiment: optional(layout.weekly_sentiment, schema::WEEKLY_SENTIMENT)?,
    })
}

/// Read a sentiment trend export: a `date` column plus the first other column.
pub fn read_trend(path: &Path) -> Result<SentimentTrend, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let names: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
        .collect();
    let date_idx = names
        .iter()
        .position(|h| h == schema::DATE)
        .ok_or_else(|| schema_error(path, 1, SchemaError::MissingColumn(schema::DATE.into())))?;
    let value_idx = (0..names.len()).find(|i| *i != date_idx).ok_or_else(|| {
        schema_error(path, 1, SchemaError::MissingColumn("sentiment value".into()))
    })?;
    let value_name = names[value_idx].clone();

    let mut points = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (i, result) in reader.records().enumerate() {
        let line = i + 2;
        let record = result.map_err(|e| csv_error(path, e))?;
        let date = parse_date(record.get(date_idx).unwrap_or(""))
            .map_err(|e| schema_error(path, line, e))?;
        let value = parse_value(record.get(value_idx).unwrap_or(""), &value_name)
            .map_err(|e| schema_error(path, line, e))?;
        if let Some(value) = value {
            if seen.insert(date) {
                points.push((date, value));
            }
        }
    }
    points.sort_by_key(|(date, _)| *date);
    Ok(points)
}
