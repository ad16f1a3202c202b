//! Aggregation pipeline: catalog once, then align, select sentiment, truncate.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::align::{align, BaselineSelector};
use super::catalog::{build_catalog, combinations, CatalogBuild, CatalogError, RecordDiagnostic};
use super::sentiment::{attach_sentiment, select_sentiment_with_trend};
use super::truncate::{max_forecast_date, truncate};
use crate::data::{DataError, SeriesLoader};
use crate::domain::{AlignedTable, SentimentSource, SeriesKey};

/// What to aggregate for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub ticker: String,
    pub combos: Vec<(String, u32)>,
    pub baseline: BaselineSelector,
    pub include_sentiment: bool,
}

impl AggregationRequest {
    pub fn new(ticker: impl Into<String>, combos: Vec<(String, u32)>) -> Self {
        Self {
            ticker: ticker.into(),
            combos,
            baseline: BaselineSelector::default(),
            include_sentiment: true,
        }
    }

    /// Request every `(model, horizon)` combination.
    pub fn for_selection(ticker: impl Into<String>, models: &[String], horizons: &[u32]) -> Self {
        Self::new(ticker, combinations(models, horizons))
    }

    pub fn with_baseline(mut self, baseline: BaselineSelector) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_sentiment(mut self, include_sentiment: bool) -> Self {
        self.include_sentiment = include_sentiment;
        self
    }
}

/// The aligned view, or the explicit absence of one.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatedView {
    /// No record was available for the ticker.
    NoData,
    /// Aligned, sentiment-selected, truncated table. May have zero rows.
    Table(AlignedTable),
}

/// Result of one aggregation request.
#[derive(Debug)]
pub struct Aggregation {
    pub ticker: String,
    pub view: AggregatedView,
    /// Last date with a present forecast value, before truncation.
    pub max_forecast_date: Option<NaiveDate>,
    pub sentiment_source: Option<SentimentSource>,
    /// Records that exist but could not be read.
    pub diagnostics: Vec<RecordDiagnostic>,
    /// Requested keys with no backing source.
    pub missing: Vec<SeriesKey>,
    /// Failure reading the standalone sentiment trend, if one was consulted.
    pub trend_error: Option<DataError>,
}

impl Aggregation {
    pub fn table(&self) -> Option<&AlignedTable> {
        match &self.view {
            AggregatedView::Table(table) => Some(table),
            AggregatedView::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self.view, AggregatedView::NoData)
    }
}

/// Run the full pipeline for one request.
///
/// Only a catalog name collision is an error; missing and malformed sources
/// are reported on the returned [`Aggregation`].
pub fn aggregate(
    loader: &dyn SeriesLoader,
    request: &AggregationRequest,
) -> Result<Aggregation, CatalogError> {
    let CatalogBuild {
        catalog,
        diagnostics,
        missing,
    } = build_catalog(loader, &request.ticker, &request.combos)?;

    let mut aggregation = Aggregation {
        ticker: request.ticker.clone(),
        view: AggregatedView::NoData,
        max_forecast_date: None,
        sentiment_source: None,
        diagnostics,
        missing,
        trend_error: None,
    };

    let Some(table) = align(&catalog, request.baseline) else {
        info!(ticker = %request.ticker, "no forecast records found");
        return Ok(aggregation);
    };

    let sentiment = if request.include_sentiment {
        let records_carry_sentiment = catalog
            .records()
            .any(|r| r.has_daily_sentiment() || r.has_weekly_sentiment());
        let trend = if records_carry_sentiment {
            None
        } else {
            loader
                .load_sentiment_trend(&request.ticker)
                .unwrap_or_else(|error| {
                    warn!(ticker = %request.ticker, %error, "skipping sentiment trend");
                    aggregation.trend_error = Some(error);
                    None
                })
        };
        select_sentiment_with_trend(&catalog, trend)
    } else {
        None
    };
    let table = match &sentiment {
        Some(series) => attach_sentiment(table, series),
        None => table,
    };

    aggregation.max_forecast_date = max_forecast_date(&table);
    aggregation.sentiment_source = sentiment.map(|s| s.source);
    let table = truncate(table);

    info!(
        ticker = %request.ticker,
        rows = table.len(),
        columns = table.columns().len(),
        malformed = aggregation.diagnostics.len(),
        "aggregated forecasts"
    );
    aggregation.view = AggregatedView::Table(table);
    Ok(aggregation)
}
