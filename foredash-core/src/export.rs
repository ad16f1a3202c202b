//! Export of aligned tables and score tables: CSV, JSON, and Markdown.
//!
//! Every exported table carries its BLAKE3 content hash so two exports of
//! the same view can be compared without diffing the values.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::domain::{AlignedTable, Column};
use crate::engine::Aggregation;
use crate::scores::ScoreTable;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to flush csv writer: {0}")]
    Flush(String),

    #[error("csv output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to write '{path}': {reason}")]
    Io { path: String, reason: String },
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export an aligned table as CSV: `date` followed by every column in order.
///
/// Absent values are written as empty cells; present values use the
/// shortest form that parses back to the same `f64`.
pub fn table_to_csv(table: &AlignedTable) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date"];
    header.extend(table.column_names());
    wtr.write_record(&header)?;

    for (i, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(table.columns().len() + 1);
        record.push(date.to_string());
        record.extend(table.columns().iter().map(|c| format_cell(c.values()[i])));
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

/// Export score rows as CSV with the canonical `ticker,model,horizon,rmse` header.
pub fn scores_to_csv(scores: &ScoreTable) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in scores.rows() {
        wtr.serialize(row)?;
    }
    if scores.is_empty() {
        wtr.write_record(["ticker", "model", "horizon", "rmse"])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(data)?)
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ─── JSON export ────────────────────────────────────────────────────

#[derive(Serialize)]
struct TableDocument<'a> {
    ticker: &'a str,
    title: &'a str,
    content_hash: String,
    dates: Vec<String>,
    columns: &'a [Column],
}

/// Serialize an aligned table to pretty JSON, including its content hash.
pub fn table_to_json(table: &AlignedTable) -> Result<String, ExportError> {
    let document = TableDocument {
        ticker: table.ticker(),
        title: table.title(),
        content_hash: table.content_hash(),
        dates: table.dates().iter().map(|d| d.to_string()).collect(),
        columns: table.columns(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Human-readable summary of one aggregation: coverage per column and diagnostics.
pub fn aggregation_report(aggregation: &Aggregation) -> String {
    let mut md = String::with_capacity(1024);
    let Some(table) = aggregation.table() else {
        md.push_str(&format!("# {}\n\nNo forecast data.\n", aggregation.ticker));
        return md;
    };

    md.push_str(&format!("# {}\n\n", table.title()));
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Ticker | {} |\n", table.ticker()));
    if let (Some(first), Some(last)) = (table.dates().first(), table.dates().last()) {
        md.push_str(&format!("| Period | {first} to {last} |\n"));
    }
    md.push_str(&format!("| Rows | {} |\n", table.len()));
    match aggregation.max_forecast_date {
        Some(date) => md.push_str(&format!("| Last Forecast | {date} |\n")),
        None => md.push_str("| Last Forecast | none |\n"),
    }
    match aggregation.sentiment_source {
        Some(source) => md.push_str(&format!("| Sentiment | {source:?} |\n")),
        None => md.push_str("| Sentiment | none |\n"),
    }
    md.push_str(&format!("| Content Hash | {} |\n\n", table.content_hash()));

    md.push_str("## Columns\n\n");
    md.push_str("| Column | Present |\n");
    md.push_str("| --- | ---: |\n");
    for column in table.columns() {
        md.push_str(&format!(
            "| {} | {}/{} |\n",
            column.name(),
            column.present_count(),
            table.len()
        ));
    }

    if !aggregation.diagnostics.is_empty() {
        md.push_str("\n## Skipped Records\n\n");
        for diagnostic in &aggregation.diagnostics {
            md.push_str(&format!("- `{}`: {}\n", diagnostic.key, diagnostic.error));
        }
    }
    md
}

/// Markdown leaderboard of score rows, best RMSE first.
pub fn scores_report(scores: &ScoreTable) -> String {
    let mut md = String::from("| Rank | Ticker | Model | Horizon | RMSE |\n");
    md.push_str("| ---: | --- | --- | ---: | ---: |\n");
    for (rank, row) in scores.ranked().into_iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {} | {}d | {:.4} |\n",
            rank + 1,
            row.ticker,
            row.model,
            row.horizon,
            row.rmse
        ));
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `{ticker}.csv`, `{ticker}.json`, and `{ticker}.md` under `output_dir`.
///
/// Returns the CSV path. A no-data aggregation writes only the report.
pub fn save_artifacts(aggregation: &Aggregation, output_dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(output_dir).map_err(|e| io_error(output_dir, e))?;
    let stem = aggregation.ticker.to_lowercase();

    let report_path = output_dir.join(format!("{stem}.md"));
    write(&report_path, &aggregation_report(aggregation))?;

    let Some(table) = aggregation.table() else {
        return Ok(report_path);
    };
    let csv_path = output_dir.join(format!("{stem}.csv"));
    write(&csv_path, &table_to_csv(table)?)?;
    write(&output_dir.join(format!("{stem}.json")), &table_to_json(table)?)?;
    Ok(csv_path)
}

fn write(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, e: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryLoader;
    use crate::domain::{SeriesKey, SeriesRecord, SeriesRow, Variant};
    use crate::engine::{aggregate, AggregationRequest};
    use crate::scores::ScoreRow;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_aggregation() -> Aggregation {
        let rows = (1..=3)
            .map(|day| SeriesRow {
                close: Some(100.0 + day as f64),
                forecast: (day >= 2).then_some(200.0 + day as f64),
                ..SeriesRow::empty(d(day))
            })
            .collect();
        let loader = MemoryLoader::with_records([SeriesRecord::new(
            SeriesKey::new("AAPL", "lstm", 1, Variant::Base),
            rows,
        )]);
        let request = AggregationRequest::for_selection("AAPL", &["lstm".into()], &[1]);
        aggregate(&loader, &request).unwrap()
    }

    #[test]
    fn csv_has_date_then_columns_and_blank_gaps() {
        let aggregation = sample_aggregation();
        let csv = table_to_csv(aggregation.table().unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,actual_close,lstm_1d");
        assert_eq!(lines[1], "2024-01-01,101,");
        assert_eq!(lines[3], "2024-01-03,103,203");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn csv_keeps_full_precision() {
        let rows = vec![SeriesRow {
            close: Some(1.0),
            forecast: Some(1.0 / 3.0),
            daily_sentiment: Some(4e-7),
            ..SeriesRow::empty(d(1))
        }];
        let loader = MemoryLoader::with_records([SeriesRecord::new(
            SeriesKey::new("AAPL", "lstm", 1, Variant::Base),
            rows,
        )]);
        let request = AggregationRequest::for_selection("AAPL", &["lstm".into()], &[1]);
        let aggregation = aggregate(&loader, &request).unwrap();
        let csv = table_to_csv(aggregation.table().unwrap()).unwrap();

        let cells: Vec<&str> = csv.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(cells[3].parse::<f64>().unwrap(), 4e-7);
        assert_eq!(cells[2].parse::<f64>().unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn json_includes_title_and_hash() {
        let aggregation = sample_aggregation();
        let table = aggregation.table().unwrap();
        let json = table_to_json(table).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["ticker"], "AAPL");
        assert_eq!(parsed["title"], table.title());
        assert_eq!(parsed["content_hash"], table.content_hash());
        assert_eq!(parsed["dates"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["columns"][1]["kind"]["kind"], "forecast");
    }

    #[test]
    fn scores_csv_keeps_header_when_empty() {
        let csv = scores_to_csv(&ScoreTable::default()).unwrap();
        assert_eq!(csv.trim(), "ticker,model,horizon,rmse");

        let table = ScoreTable::new(vec![ScoreRow {
            ticker: "BA".into(),
            model: "arima".into(),
            horizon: 7,
            rmse: 1.25,
        }]);
        let csv = scores_to_csv(&table).unwrap();
        assert_eq!(csv.lines().nth(1), Some("BA,arima,7,1.25"));
    }

    #[test]
    fn report_lists_column_coverage() {
        let md = aggregation_report(&sample_aggregation());
        assert!(md.contains("| lstm_1d | 2/3 |"));
        assert!(md.contains("| Last Forecast | 2024-01-03 |"));
    }

    #[test]
    fn report_for_no_data() {
        let loader = MemoryLoader::new();
        let request = AggregationRequest::for_selection("MSFT", &["lstm".into()], &[1]);
        let aggregation = aggregate(&loader, &request).unwrap();
        assert!(aggregation_report(&aggregation).contains("No forecast data."));
    }

    #[test]
    fn scores_report_ranks_best_first() {
        let table = ScoreTable::new(vec![
            ScoreRow { ticker: "A".into(), model: "x".into(), horizon: 1, rmse: 3.0 },
            ScoreRow { ticker: "A".into(), model: "y".into(), horizon: 1, rmse: 1.0 },
        ]);
        let md = scores_report(&table);
        let first_row = md.lines().nth(2).unwrap();
        assert!(first_row.starts_with("| 1 | A | y |"));
    }

    #[test]
    fn save_artifacts_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_artifacts(&sample_aggregation(), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("aapl.csv"));
        assert!(dir.path().join("aapl.json").exists());
        assert!(dir.path().join("aapl.md").exists());
    }
}
