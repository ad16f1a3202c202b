//! Series catalog: discovers records for a ticker and names their columns.
//!
//! One catalog is built per request. It owns the loaded records in discovery
//! order (requested combinations in order, base before tuned) and guarantees
//! every entry has a unique, non-empty column name.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::data::{DataError, SeriesLoader};
use crate::domain::{SeriesKey, SeriesRecord, Variant};

/// Errors that abort a catalog build.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate column name '{name}' for ticker {ticker}")]
    DuplicateColumnName { ticker: String, name: String },

    #[error("record {key} does not belong to ticker {expected}")]
    TickerMismatch { key: SeriesKey, expected: String },
}

/// A record that failed to load; the rest of the catalog is unaffected.
#[derive(Debug)]
pub struct RecordDiagnostic {
    pub key: SeriesKey,
    pub error: DataError,
}

/// A named record in the catalog.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    name: String,
    record: SeriesRecord,
}

impl CatalogEntry {
    /// Column name: `{model}_{horizon}d` or `{model}_{horizon}d_tuned`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &SeriesKey {
        self.record.key()
    }

    pub fn record(&self) -> &SeriesRecord {
        &self.record
    }
}

/// Records for one ticker, in discovery order, with unique column names.
#[derive(Debug, Clone)]
pub struct SeriesCatalog {
    ticker: String,
    entries: Vec<CatalogEntry>,
}

impl SeriesCatalog {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            entries: Vec::new(),
        }
    }

    /// Add a record at the end of discovery order.
    ///
    /// Returns `Ok(false)` when the record has no rows and was dropped.
    /// A record whose column name is already taken is rejected.
    pub fn insert(&mut self, record: SeriesRecord) -> Result<bool, CatalogError> {
        if record.key().ticker != self.ticker {
            return Err(CatalogError::TickerMismatch {
                key: record.key().clone(),
                expected: self.ticker.clone(),
            });
        }
        if record.is_empty() {
            debug!(key = %record.key(), "dropping record with no rows");
            return Ok(false);
        }
        let name = record.key().column_name();
        if self.get(&name).is_some() {
            return Err(CatalogError::DuplicateColumnName {
                ticker: self.ticker.clone(),
                name,
            });
        }
        self.entries.push(CatalogEntry { name, record });
        Ok(true)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &SeriesRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of building a catalog from a loader.
#[derive(Debug)]
pub struct CatalogBuild {
    pub catalog: SeriesCatalog,
    /// Records that exist but could not be read.
    pub diagnostics: Vec<RecordDiagnostic>,
    /// Requested keys with no backing source.
    pub missing: Vec<SeriesKey>,
}

/// Every `(model, horizon)` pair, model-major, in the given order.
pub fn combinations(models: &[String], horizons: &[u32]) -> Vec<(String, u32)> {
    models
        .iter()
        .flat_map(|m| horizons.iter().map(move |h| (m.clone(), *h)))
        .collect()
}

/// Load every variant of every requested combination for `ticker`.
///
/// Duplicate combinations are requested once. A missing source is skipped;
/// a malformed record becomes a diagnostic and the build continues.
pub fn build_catalog(
    loader: &dyn SeriesLoader,
    ticker: &str,
    combos: &[(String, u32)],
) -> Result<CatalogBuild, CatalogError> {
    let mut catalog = SeriesCatalog::new(ticker);
    let mut diagnostics = Vec::new();
    let mut missing = Vec::new();
    let mut requested = HashSet::new();

    for (model, horizon) in combos {
        if !requested.insert((model.as_str(), *horizon)) {
            continue;
        }
        for variant in Variant::ALL {
            let key = SeriesKey::new(ticker, model.as_str(), *horizon, variant);
            match loader.load(&key) {
                Ok(Some(record)) => {
                    catalog.insert(record)?;
                }
                Ok(None) => {
                    debug!(key = %key, loader = loader.name(), "no source");
                    missing.push(key);
                }
                Err(error) => {
                    warn!(key = %key, %error, "skipping malformed record");
                    diagnostics.push(RecordDiagnostic { key, error });
                }
            }
        }
    }

    Ok(CatalogBuild {
        catalog,
        diagnostics,
        missing,
    })
}
