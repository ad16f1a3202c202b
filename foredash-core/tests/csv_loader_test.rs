//! Integration tests for the CSV export directory loader.

use chrono::NaiveDate;
use std::path::Path;

use foredash_core::data::{CsvDirLoader, DataError, SeriesLoader};
use foredash_core::domain::{SentimentSource, SeriesKey, Variant};
use foredash_core::export::table_to_csv;
use foredash_core::{aggregate, AggregationRequest, DashboardConfig};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

fn lstm_1d() -> SeriesKey {
    SeriesKey::new("AAPL", "lstm", 1, Variant::Base)
}

#[test]
fn worked_example_from_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_model_1d.csv",
        "date,close,model_1d\n\
         2024-01-01,10,\n\
         2024-01-02,11,\n\
         2024-01-03,12,\n\
         2024-01-04,13,20\n\
         2024-01-05,14,21\n",
    );
    write(
        dir.path(),
        "AAPL_model_3d.csv",
        "date,close,model_3d\n2024-01-03,12,30\n2024-01-04,13,31\n",
    );

    let loader = CsvDirLoader::new(dir.path());
    let request = AggregationRequest::new("AAPL", vec![("model".into(), 1), ("model".into(), 3)]);
    let aggregation = aggregate(&loader, &request).unwrap();

    assert_eq!(aggregation.max_forecast_date, Some(d(5)));
    let csv = table_to_csv(aggregation.table().unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "date,actual_close,model_1d,model_3d");
    assert_eq!(lines[3], "2024-01-03,12,,30");
    assert_eq!(lines[5], "2024-01-05,14,21,");
}

#[test]
fn empty_forecast_column_is_kept_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_lstm_1d.csv",
        "date,close,lstm_1d\n2024-01-01,10,\n2024-01-02,11,\n",
    );
    write(dir.path(), "AAPL_arima_1d.csv", "date,close\n2024-01-01,10\n");

    let loader = CsvDirLoader::new(dir.path());
    let request = AggregationRequest::for_selection("AAPL", &["lstm".into(), "arima".into()], &[1]);
    let aggregation = aggregate(&loader, &request).unwrap();
    let table = aggregation.table().unwrap();

    assert_eq!(table.column_names(), vec!["actual_close", "lstm_1d"]);
    assert_eq!(table.column("lstm_1d").unwrap().values(), &[None, None]);
    assert_eq!(aggregation.max_forecast_date, None);
    assert_eq!(table.len(), 2);
}

#[test]
fn full_export_is_preferred_and_plain_is_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "AAPL_lstm_1d.csv", "date,close,lstm_1d\n2024-01-01,1,2\n");
    write(
        dir.path(),
        "AAPL_lstm_1d_full.csv",
        "date,close,lstm_1d\n2024-01-01,1,2\n2024-01-02,1,3\n",
    );

    let preferred = CsvDirLoader::new(dir.path()).load(&lstm_1d()).unwrap().unwrap();
    assert_eq!(preferred.len(), 2);

    let plain_first = CsvDirLoader::new(dir.path())
        .prefer_full(false)
        .load(&lstm_1d())
        .unwrap()
        .unwrap();
    assert_eq!(plain_first.len(), 1);

    std::fs::remove_file(dir.path().join("AAPL_lstm_1d.csv")).unwrap();
    let fallback = CsvDirLoader::new(dir.path())
        .prefer_full(false)
        .load(&lstm_1d())
        .unwrap()
        .unwrap();
    assert_eq!(fallback.len(), 2);
}

#[test]
fn legacy_aliases_and_unsorted_rows() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_lstm_1d.csv",
        "Date,Actual,Forecast\n2024-01-03,3,30\n2024-01-01,1,\n2024-01-02,2,NaN\n",
    );
    let record = CsvDirLoader::new(dir.path()).load(&lstm_1d()).unwrap().unwrap();
    let dates: Vec<NaiveDate> = record.dates().collect();
    assert_eq!(dates, vec![d(1), d(2), d(3)]);
    assert_eq!(record.forecast_points(), vec![(d(3), 30.0)]);
}

#[test]
fn malformed_file_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_lstm_1d.csv",
        "date,close,lstm_1d\n2024-01-01,1,2\n2024-01-02,1,3\n",
    );
    write(
        dir.path(),
        "AAPL_lstm_1d_tuned.csv",
        "date,close,lstm_1d_tuned\nnot-a-date,1,2\n",
    );

    let loader = CsvDirLoader::new(dir.path());
    let tuned = SeriesKey::new("AAPL", "lstm", 1, Variant::Tuned);
    let err = loader.load(&tuned).unwrap_err();
    assert!(matches!(err, DataError::MalformedRecord { .. }));
    assert!(err.to_string().contains("line 2"));

    let request = AggregationRequest::for_selection("AAPL", &["lstm".into()], &[1]);
    let aggregation = aggregate(&loader, &request).unwrap();
    assert_eq!(aggregation.diagnostics.len(), 1);
    assert_eq!(aggregation.diagnostics[0].key, tuned);
    assert_eq!(
        aggregation.table().unwrap().column_names(),
        vec!["actual_close", "lstm_1d"]
    );
}

#[test]
fn missing_required_column_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "AAPL_lstm_1d.csv", "date,lstm_1d\n2024-01-01,2\n");
    let err = CsvDirLoader::new(dir.path()).load(&lstm_1d()).unwrap_err();
    assert!(err.to_string().contains("close"));
}

#[test]
fn trend_file_supplies_sentiment_when_records_have_none() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_lstm_1d.csv",
        "date,close,lstm_1d\n2024-01-01,1,2\n2024-01-02,1,3\n",
    );
    write(
        dir.path(),
        "AAPL_sentiment_trend.csv",
        "date,sentiment_score\n2024-01-02,0.4\n2024-01-01,\n2024-01-09,0.9\n",
    );

    let loader = CsvDirLoader::new(dir.path());
    let request = AggregationRequest::for_selection("AAPL", &["lstm".into()], &[1]);
    let aggregation = aggregate(&loader, &request).unwrap();
    assert_eq!(aggregation.sentiment_source, Some(SentimentSource::Trend));
    assert_eq!(
        aggregation.table().unwrap().sentiment().unwrap().values(),
        &[None, Some(0.4)]
    );
}

#[test]
fn broken_trend_file_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_lstm_1d.csv",
        "date,close,lstm_1d\n2024-01-01,1,2\n",
    );
    write(dir.path(), "AAPL_sentiment_trend.csv", "date,score\n2024-01-01,high\n");

    let loader = CsvDirLoader::new(dir.path());
    let request = AggregationRequest::for_selection("AAPL", &["lstm".into()], &[1]);
    let aggregation = aggregate(&loader, &request).unwrap();
    assert!(aggregation.trend_error.is_some());
    assert!(aggregation.sentiment_source.is_none());
    assert_eq!(aggregation.table().unwrap().len(), 1);
}

#[test]
fn discover_lists_each_key_once() {
    let dir = tempfile::tempdir().unwrap();
    for name in [
        "AAPL_lstm_1d.csv",
        "AAPL_lstm_1d_full.csv",
        "AAPL_arima_7d_tuned.csv",
        "MSFT_lstm_1d.csv",
        "AAPL_sentiment_trend.csv",
        "rmse_summary.csv",
    ] {
        write(dir.path(), name, "date,close\n");
    }
    let keys = CsvDirLoader::new(dir.path()).discover("AAPL").unwrap();
    let names: Vec<String> = keys.iter().map(|k| k.column_name()).collect();
    assert_eq!(names, vec!["arima_7d_tuned", "lstm_1d"]);
}

#[test]
fn config_loader_reads_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "AAPL_lstm_1d.csv",
        "date,close,lstm_1d\n2024-01-01,1,2\n",
    );
    let config = DashboardConfig {
        data_dir: dir.path().to_path_buf(),
        ..DashboardConfig::default()
    };
    let record = config.loader().load(&lstm_1d()).unwrap();
    assert!(record.is_some());
    assert_eq!(config.scores_path(), dir.path().join("rmse_summary.csv"));
}
