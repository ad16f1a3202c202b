//! Aggregation engine: catalog, alignment, sentiment selection, truncation.
//!
//! Each stage after the catalog is a side-effect-free transform over the
//! catalog built once per request.

pub mod align;
pub mod catalog;
pub mod pipeline;
pub mod sentiment;
pub mod truncate;

pub use align::{align, left_join, BaselineSelector};
pub use catalog::{
    build_catalog, combinations, CatalogBuild, CatalogEntry, CatalogError, RecordDiagnostic,
    SeriesCatalog,
};
pub use pipeline::{aggregate, AggregatedView, Aggregation, AggregationRequest};
pub use sentiment::{attach_sentiment, select_sentiment, select_sentiment_with_trend, SentimentSeries};
pub use truncate::{max_forecast_date, truncate};
