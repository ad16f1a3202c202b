//! Sentiment selection: one sentiment column per ticker, by fixed priority.
//!
//! Priority: the first record carrying `daily_sentiment`, else the first
//! carrying `weekly_sentiment`, else the standalone trend export. Discovery
//! order only breaks ties within a priority level.

use chrono::NaiveDate;

use super::align::left_join;
use super::catalog::SeriesCatalog;
use crate::data::SentimentTrend;
use crate::domain::{AlignedTable, Column, ColumnKind, SentimentSource, SeriesKey, SENTIMENT};

/// The chosen sentiment values before they are joined onto a table.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentSeries {
    pub source: SentimentSource,
    /// Record the values came from; `None` for the trend export.
    pub origin: Option<SeriesKey>,
    pub points: Vec<(NaiveDate, f64)>,
}

impl SentimentSeries {
    pub fn from_trend(points: SentimentTrend) -> Self {
        Self {
            source: SentimentSource::Trend,
            origin: None,
            points,
        }
    }
}

/// Pick the sentiment series from the catalog records.
pub fn select_sentiment(catalog: &SeriesCatalog) -> Option<SentimentSeries> {
    let from_records = |source: SentimentSource| {
        catalog.records().find_map(|record| {
            let points = match source {
                SentimentSource::Daily => record.daily_sentiment_points(),
                SentimentSource::Weekly => record.weekly_sentiment_points(),
                SentimentSource::Trend => return None,
            };
            (!points.is_empty()).then(|| SentimentSeries {
                source,
                origin: Some(record.key().clone()),
                points,
            })
        })
    };

    from_records(SentimentSource::Daily).or_else(|| from_records(SentimentSource::Weekly))
}

/// Like [`select_sentiment`], falling back to a trend export when no record carries sentiment.
pub fn select_sentiment_with_trend(
    catalog: &SeriesCatalog,
    trend: Option<SentimentTrend>,
) -> Option<SentimentSeries> {
    select_sentiment(catalog).or_else(|| {
        trend
            .filter(|points| !points.is_empty())
            .map(SentimentSeries::from_trend)
    })
}

/// Join the sentiment series onto the table's date index as the `sentiment` column.
pub fn attach_sentiment(mut table: AlignedTable, series: &SentimentSeries) -> AlignedTable {
    let values = left_join(table.dates(), &series.points);
    table.push_column(Column::new(
        SENTIMENT,
        ColumnKind::Sentiment {
            source: series.source,
        },
        values,
    ));
    table
}
