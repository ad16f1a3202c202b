//! Foredash Core: forecast catalog, alignment, sentiment selection, truncation, scores.
//!
//! This crate turns per-ticker forecast exports into chart-ready tables:
//! - Domain types (series keys, records, the aligned table)
//! - Record loading behind the `SeriesLoader` trait (CSV directory, in-memory)
//! - Catalog build, baseline-dominant alignment, sentiment priority, truncation
//! - RMSE score filtering
//! - Dashboard configuration and table export

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod export;
pub mod scores;

pub use config::{ConfigError, DashboardConfig};
pub use engine::{aggregate, AggregatedView, Aggregation, AggregationRequest, BaselineSelector};
pub use scores::{ScoreError, ScoreRow, ScoreSelection, ScoreTable};
