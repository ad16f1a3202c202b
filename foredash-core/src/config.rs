//! Dashboard configuration: data location and the selectable universe.
//!
//! Stored as TOML. Every field has a default, so an empty file (or no file)
//! reproduces the stock dashboard: five tickers, five models, three horizons.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::CsvDirLoader;
use crate::engine::BaselineSelector;
use crate::scores::ScoreSelection;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Serializable dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding the forecast exports.
    pub data_dir: PathBuf,
    /// Scores CSV; defaults to `rmse_summary.csv` inside `data_dir`.
    pub scores_file: Option<PathBuf>,
    pub tickers: Vec<String>,
    pub models: Vec<String>,
    pub horizons: Vec<u32>,
    /// Overlay sentiment when any source provides it.
    pub include_sentiment: bool,
    /// Try `_full` exports before plain ones.
    pub prefer_full: bool,
    pub baseline: BaselineSelector,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("forecast_exports"),
            scores_file: None,
            tickers: ["AAPL", "AMZN", "TSLA", "MSFT", "BA"]
                .into_iter()
                .map(String::from)
                .collect(),
            models: ["lstm", "arima", "arimax", "sarimax", "xgboost"]
                .into_iter()
                .map(String::from)
                .collect(),
            horizons: vec![1, 3, 7],
            include_sentiment: true,
            prefer_full: true,
            baseline: BaselineSelector::default(),
        }
    }
}

impl DashboardConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject empty universes, zero horizons, and repeated entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("tickers must not be empty".into()));
        }
        if self.models.is_empty() {
            return Err(ConfigError::Invalid("models must not be empty".into()));
        }
        if self.horizons.is_empty() {
            return Err(ConfigError::Invalid("horizons must not be empty".into()));
        }
        if self.horizons.contains(&0) {
            return Err(ConfigError::Invalid("horizons must be at least 1 day".into()));
        }
        if let Some(t) = first_duplicate(&self.tickers) {
            return Err(ConfigError::Invalid(format!("duplicate ticker '{t}'")));
        }
        if let Some(m) = first_duplicate(&self.models) {
            return Err(ConfigError::Invalid(format!("duplicate model '{m}'")));
        }
        if let Some(h) = first_duplicate(&self.horizons) {
            return Err(ConfigError::Invalid(format!("duplicate horizon {h}")));
        }
        Ok(())
    }

    /// Resolved path of the scores CSV.
    pub fn scores_path(&self) -> PathBuf {
        self.scores_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("rmse_summary.csv"))
    }

    /// CSV loader over `data_dir` honoring `prefer_full`.
    pub fn loader(&self) -> CsvDirLoader {
        CsvDirLoader::new(self.data_dir.clone()).prefer_full(self.prefer_full)
    }

    /// Selection covering the whole configured universe.
    pub fn full_selection(&self) -> ScoreSelection {
        ScoreSelection::new(
            self.tickers.iter().cloned(),
            self.models.iter().cloned(),
            self.horizons.iter().copied(),
        )
    }
}

fn first_duplicate<T: Eq + Hash>(items: &[T]) -> Option<&T> {
    let mut seen = HashSet::new();
    items.iter().find(|item| !seen.insert(*item))
}
