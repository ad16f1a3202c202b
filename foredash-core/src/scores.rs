//! RMSE score table and its ticker/model/horizon filter.
//!
//! The scores file is evaluated upstream, one row per (ticker, model,
//! horizon). Filtering is conjunctive over three selection sets, and an
//! empty set matches nothing: there is no implicit "select all".

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("failed to read scores from '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("malformed scores row {row}: {reason}")]
    Malformed { row: usize, reason: String },
}

/// One evaluated (ticker, model, horizon) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub ticker: String,
    pub model: String,
    #[serde(deserialize_with = "deserialize_horizon")]
    pub horizon: u32,
    /// `NaN` when the cell is blank or NaN-like (evaluation failed upstream).
    #[serde(alias = "RMSE", alias = "score", deserialize_with = "deserialize_rmse")]
    pub rmse: f64,
}

/// Accept a number, or a blank / `nan` / `na` / `null` / `none` cell as `NaN`.
fn deserialize_rmse<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawScore {
        Number(f64),
        Text(String),
    }

    match RawScore::deserialize(deserializer)? {
        RawScore::Number(v) => Ok(v),
        RawScore::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty()
                || ["nan", "na", "null", "none"]
                    .iter()
                    .any(|missing| trimmed.eq_ignore_ascii_case(missing))
            {
                return Ok(f64::NAN);
            }
            trimmed
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid rmse '{raw}'")))
        }
    }
}

/// Accept `7`, `"7"`, or `"7d"`.
fn deserialize_horizon<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawHorizon {
        Number(u32),
        Text(String),
    }

    match RawHorizon::deserialize(deserializer)? {
        RawHorizon::Number(h) => Ok(h),
        RawHorizon::Text(raw) => {
            let trimmed = raw.trim();
            trimmed
                .strip_suffix('d')
                .unwrap_or(trimmed)
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid horizon '{raw}'")))
        }
    }
}

/// The selected tickers, models, and horizons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSelection {
    pub tickers: BTreeSet<String>,
    pub models: BTreeSet<String>,
    pub horizons: BTreeSet<u32>,
}

impl ScoreSelection {
    pub fn new(
        tickers: impl IntoIterator<Item = impl Into<String>>,
        models: impl IntoIterator<Item = impl Into<String>>,
        horizons: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
            models: models.into_iter().map(Into::into).collect(),
            horizons: horizons.into_iter().collect(),
        }
    }

    /// True when the row's ticker, model, and horizon are all selected.
    pub fn matches(&self, row: &ScoreRow) -> bool {
        self.tickers.contains(&row.ticker)
            && self.models.contains(&row.model)
            && self.horizons.contains(&row.horizon)
    }
}

/// A scores table in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    rows: Vec<ScoreRow>,
}

impl ScoreTable {
    pub fn new(rows: Vec<ScoreRow>) -> Self {
        Self { rows }
    }

    /// Read a scores CSV: `ticker, model, horizon, rmse` (extra columns ignored).
    pub fn from_csv_path(path: &Path) -> Result<Self, ScoreError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| ScoreError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_reader(reader)
    }

    /// Read a scores CSV held in memory.
    pub fn from_csv_str(data: &str) -> Result<Self, ScoreError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, ScoreError> {
        let mut rows = Vec::new();
        for (i, result) in reader.deserialize::<ScoreRow>().enumerate() {
            let row = result.map_err(|e| ScoreError::Malformed {
                row: i + 1,
                reason: e.to_string(),
            })?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching every dimension of the selection, in source order.
    pub fn filter(&self, selection: &ScoreSelection) -> ScoreTable {
        ScoreTable {
            rows: self
                .rows
                .iter()
                .filter(|row| selection.matches(row))
                .cloned()
                .collect(),
        }
    }

    /// Rows sorted by ascending RMSE (best first); NaN scores sort last.
    pub fn ranked(&self) -> Vec<&ScoreRow> {
        let mut rows: Vec<&ScoreRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.rmse.total_cmp(&b.rmse));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
ticker,model,horizon,rmse
AAPL,lstm,1,2.5
AAPL,arima,1,3.1
AAPL,lstm,7,4.0
MSFT,lstm,1,5.2
TSLA,xgboost,3d,9.9
";

    fn table() -> ScoreTable {
        ScoreTable::from_csv_str(CSV).unwrap()
    }

    #[test]
    fn parses_horizon_with_day_suffix() {
        let t = table();
        assert_eq!(t.len(), 5);
        assert_eq!(t.rows()[4].horizon, 3);
    }

    #[test]
    fn filter_is_conjunctive() {
        let selection = ScoreSelection::new(["AAPL"], ["lstm"], [1]);
        let filtered = table().filter(&selection);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0].rmse, 2.5);
    }

    #[test]
    fn multiple_members_per_dimension() {
        let selection = ScoreSelection::new(["AAPL", "MSFT"], ["lstm"], [1, 7]);
        let filtered = table().filter(&selection);
        let rmses: Vec<f64> = filtered.rows().iter().map(|r| r.rmse).collect();
        assert_eq!(rmses, vec![2.5, 4.0, 5.2]);
    }

    #[test]
    fn empty_dimension_matches_nothing() {
        let no_tickers = ScoreSelection::new(Vec::<String>::new(), ["lstm", "arima"], [1, 3, 7]);
        assert!(table().filter(&no_tickers).is_empty());

        let no_horizons = ScoreSelection::new(["AAPL"], ["lstm"], Vec::<u32>::new());
        assert!(table().filter(&no_horizons).is_empty());
    }

    #[test]
    fn score_column_aliases_are_accepted() {
        let t = ScoreTable::from_csv_str("ticker,model,horizon,score\nBA,arimax,7,1.5\n").unwrap();
        assert_eq!(t.rows()[0].rmse, 1.5);
    }

    #[test]
    fn bad_rmse_reports_row_number() {
        let err = ScoreTable::from_csv_str("ticker,model,horizon,rmse\nBA,arimax,7,high\n")
            .unwrap_err();
        assert!(matches!(err, ScoreError::Malformed { row: 1, .. }));
    }

    #[test]
    fn blank_rmse_loads_as_nan_and_ranks_last() {
        let t = ScoreTable::from_csv_str(
            "ticker,model,horizon,rmse\nAAPL,lstm,1,2.5\nAAPL,arima,1,\nAAPL,xgboost,1,NaN\n",
        )
        .unwrap();
        assert_eq!(t.len(), 3);
        assert!(t.rows()[1].rmse.is_nan());
        assert!(t.rows()[2].rmse.is_nan());

        let ranked = t.ranked();
        assert_eq!(ranked[0].model, "lstm");
        assert!(ranked[1].rmse.is_nan());

        let selection = ScoreSelection::new(["AAPL"], ["arima"], [1]);
        assert_eq!(t.filter(&selection).len(), 1);
    }

    #[test]
    fn ranked_orders_best_first() {
        let t = table();
        let ranked = t.ranked();
        assert_eq!(ranked[0].rmse, 2.5);
        assert_eq!(ranked.last().unwrap().rmse, 9.9);
    }
}
