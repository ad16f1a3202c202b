//! Baseline-dominant alignment of catalog records onto one date index.
//!
//! The baseline record supplies the date axis and `actual_close`. Every
//! record carrying a forecast contributes one column, left-joined onto that
//! axis: dates the baseline lacks are dropped, baseline dates the record
//! lacks stay absent. Forecasts never extend or shrink the visible range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::catalog::{CatalogEntry, SeriesCatalog};
use crate::domain::{AlignedTable, Column, ColumnKind};

/// How the baseline record is chosen from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSelector {
    /// First record in discovery order.
    #[default]
    FirstDiscovered,
    /// Record with the most present close prices; ties go to the earliest discovered.
    MostComplete,
    /// Smallest `(model, horizon, variant)`, independent of discovery order.
    Canonical,
}

impl BaselineSelector {
    pub fn select<'a>(&self, catalog: &'a SeriesCatalog) -> Option<&'a CatalogEntry> {
        let entries = catalog.entries();
        match self {
            BaselineSelector::FirstDiscovered => entries.first(),
            BaselineSelector::MostComplete => {
                // max_by_key keeps the last maximum; reverse so ties resolve to the earliest.
                entries
                    .iter()
                    .rev()
                    .max_by_key(|e| e.record().close_count())
            }
            BaselineSelector::Canonical => entries.iter().min_by(|a, b| {
                let (ka, kb) = (a.key(), b.key());
                (&ka.model, ka.horizon, ka.variant).cmp(&(&kb.model, kb.horizon, kb.variant))
            }),
        }
    }
}

impl fmt::Display for BaselineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaselineSelector::FirstDiscovered => "first_discovered",
            BaselineSelector::MostComplete => "most_complete",
            BaselineSelector::Canonical => "canonical",
        };
        write!(f, "{name}")
    }
}

impl FromStr for BaselineSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_discovered" | "first" => Ok(BaselineSelector::FirstDiscovered),
            "most_complete" => Ok(BaselineSelector::MostComplete),
            "canonical" => Ok(BaselineSelector::Canonical),
            other => Err(format!(
                "unknown baseline selector '{other}' (expected first_discovered, most_complete, canonical)"
            )),
        }
    }
}

/// Align every catalog record onto the baseline's date index.
///
/// Returns `None` when the catalog is empty: there is no baseline and
/// therefore nothing to show. Sentiment is not touched here.
pub fn align(catalog: &SeriesCatalog, selector: BaselineSelector) -> Option<AlignedTable> {
    let baseline = selector.select(catalog)?.record();

    let dates: Vec<NaiveDate> = baseline.dates().collect();
    let close: Vec<Option<f64>> = baseline.rows().iter().map(|r| r.close).collect();
    let mut table = AlignedTable::with_baseline(catalog.ticker(), dates, close);

    for entry in catalog.entries() {
        if !entry.record().has_forecast_column() {
            continue;
        }
        let values = left_join(table.dates(), &entry.record().forecast_points());
        table.push_column(Column::new(
            entry.name(),
            ColumnKind::Forecast {
                key: entry.key().clone(),
            },
            values,
        ));
    }

    if let Some(title) = single_combination_title(catalog) {
        table.set_title(title);
    }
    Some(table)
}

/// Project `points` onto `index` by exact date match.
///
/// Points outside the index are dropped; index dates without a point are
/// absent. If a date repeats in `points`, the first value wins.
pub fn left_join(index: &[NaiveDate], points: &[(NaiveDate, f64)]) -> Vec<Option<f64>> {
    let mut by_date: HashMap<NaiveDate, f64> = HashMap::with_capacity(points.len());
    for (date, value) in points {
        by_date.entry(*date).or_insert(*value);
    }
    index.iter().map(|date| by_date.get(date).copied()).collect()
}

/// `"AAPL LSTM Forecast (3-Day)"` when every record shares one model and horizon.
fn single_combination_title(catalog: &SeriesCatalog) -> Option<String> {
    let first = catalog.entries().first()?.key();
    let same = catalog
        .entries()
        .iter()
        .all(|e| e.key().model == first.model && e.key().horizon == first.horizon);
    same.then(|| {
        format!(
            "{} {} Forecast ({}-Day)",
            catalog.ticker(),
            first.model.to_uppercase(),
            first.horizon
        )
    })
}
