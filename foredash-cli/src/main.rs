//! Foredash CLI: inspect forecast exports and RMSE scores from the terminal.
//!
//! Commands:
//! - `show`: aggregate one ticker into an aligned, truncated table
//! - `catalog`: list the forecast exports found for a ticker
//! - `scores`: filter the RMSE table by ticker, model, and horizon
//! - `summary`: aggregate every configured ticker in parallel
//! - `init-config`: write the default dashboard config as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foredash_core::data::SeriesLoader;
use foredash_core::domain::AlignedTable;
use foredash_core::export::{
    save_artifacts, scores_report, scores_to_csv, table_to_csv, table_to_json,
};
use foredash_core::{
    aggregate, Aggregation, AggregationRequest, BaselineSelector, DashboardConfig, ScoreSelection,
    ScoreTable,
};

#[derive(Parser)]
#[command(
    name = "foredash",
    about = "Foredash CLI: forecast dashboard aggregation engine"
)]
struct Cli {
    /// Path to a dashboard TOML config. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the forecast export directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate one ticker into an aligned, truncated table.
    Show {
        /// Ticker symbol (e.g., AAPL).
        #[arg(long)]
        ticker: String,

        /// Models to include. Defaults to every configured model.
        #[arg(long = "model")]
        models: Vec<String>,

        /// Horizons in days. Defaults to every configured horizon.
        #[arg(long = "horizon")]
        horizons: Vec<u32>,

        /// Baseline rule: first-discovered, most-complete, or canonical.
        #[arg(long)]
        baseline: Option<BaselineSelector>,

        /// Skip the sentiment overlay.
        #[arg(long, default_value_t = false)]
        no_sentiment: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t = TableFormat::Table)]
        format: TableFormat,

        /// Also save CSV, JSON, and Markdown artifacts to this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// List the forecast exports found for a ticker.
    Catalog {
        /// Ticker symbol.
        #[arg(long)]
        ticker: String,
    },
    /// Filter the RMSE scores table.
    Scores {
        /// Tickers to select. Defaults to every configured ticker.
        #[arg(long = "ticker")]
        tickers: Vec<String>,

        /// Models to select. Defaults to every configured model.
        #[arg(long = "model")]
        models: Vec<String>,

        /// Horizons to select. Defaults to every configured horizon.
        #[arg(long = "horizon")]
        horizons: Vec<u32>,

        /// Treat omitted dimensions as empty selections instead of defaults.
        #[arg(long, default_value_t = false)]
        none_selected: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t = ScoresFormat::Table)]
        format: ScoresFormat,
    },
    /// Aggregate every configured ticker in parallel and print one line each.
    Summary,
    /// Write the default dashboard config as TOML.
    InitConfig {
        /// Destination file.
        #[arg(long, default_value = "foredash.toml")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TableFormat {
    Table,
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScoresFormat {
    Table,
    Csv,
    Markdown,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Show {
            ticker,
            models,
            horizons,
            baseline,
            no_sentiment,
            format,
            output_dir,
        } => {
            let request = AggregationRequest::for_selection(
                ticker.to_uppercase(),
                &or_default(models, &config.models),
                &or_default(horizons, &config.horizons),
            )
            .with_baseline(baseline.unwrap_or(config.baseline))
            .with_sentiment(config.include_sentiment && !no_sentiment);
            run_show(&config, &request, format, output_dir.as_deref())
        }
        Commands::Catalog { ticker } => run_catalog(&config, &ticker.to_uppercase()),
        Commands::Scores {
            tickers,
            models,
            horizons,
            none_selected,
            format,
        } => {
            let selection = if none_selected {
                ScoreSelection::new(tickers, models, horizons)
            } else {
                ScoreSelection::new(
                    or_default(tickers, &config.tickers),
                    or_default(models, &config.models),
                    or_default(horizons, &config.horizons),
                )
            };
            run_scores(&config, &selection, format)
        }
        Commands::Summary => run_summary(&config),
        Commands::InitConfig { output, force } => run_init_config(&output, force),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<DashboardConfig> {
    let mut config = match path {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    debug!(data_dir = %config.data_dir.display(), "using config");
    Ok(config)
}

fn or_default<T: Clone>(given: Vec<T>, fallback: &[T]) -> Vec<T> {
    if given.is_empty() {
        fallback.to_vec()
    } else {
        given
    }
}

fn run_show(
    config: &DashboardConfig,
    request: &AggregationRequest,
    format: TableFormat,
    output_dir: Option<&Path>,
) -> Result<()> {
    let loader = config.loader();
    let aggregation = aggregate(&loader, request)
        .with_context(|| format!("failed to aggregate {}", request.ticker))?;

    for diagnostic in &aggregation.diagnostics {
        eprintln!("Skipped {}: {}", diagnostic.key, diagnostic.error);
    }

    let Some(table) = aggregation.table() else {
        bail!(
            "no forecast data for {} in {}",
            request.ticker,
            config.data_dir.display()
        );
    };

    match format {
        TableFormat::Table => print_table(table),
        TableFormat::Csv => print!("{}", table_to_csv(table)?),
        TableFormat::Json => println!("{}", table_to_json(table)?),
    }

    if let Some(dir) = output_dir {
        let path = save_artifacts(&aggregation, dir)?;
        println!("Artifacts saved to: {}", path.display());
    }
    Ok(())
}

fn run_catalog(config: &DashboardConfig, ticker: &str) -> Result<()> {
    let loader = config.loader();
    let keys = loader
        .discover(ticker)
        .with_context(|| format!("failed to scan {}", config.data_dir.display()))?;

    if keys.is_empty() {
        println!("No forecast exports for {ticker} in {}", config.data_dir.display());
        return Ok(());
    }

    println!("{:<22} {:<10} {:>8} {:>10}", "Column", "Model", "Horizon", "Rows");
    println!("{}", "-".repeat(53));
    for key in &keys {
        let rows = match loader.load(key) {
            Ok(Some(record)) => record.len().to_string(),
            Ok(None) => "-".to_string(),
            Err(_) => "malformed".to_string(),
        };
        println!(
            "{:<22} {:<10} {:>7}d {:>10}",
            key.column_name(),
            key.model,
            key.horizon,
            rows
        );
    }
    Ok(())
}

fn run_scores(
    config: &DashboardConfig,
    selection: &ScoreSelection,
    format: ScoresFormat,
) -> Result<()> {
    let path = config.scores_path();
    let scores = ScoreTable::from_csv_path(&path)
        .with_context(|| format!("failed to load scores from {}", path.display()))?;
    let filtered = scores.filter(selection);
    info!(total = scores.len(), selected = filtered.len(), "filtered scores");

    match format {
        ScoresFormat::Csv => print!("{}", scores_to_csv(&filtered)?),
        ScoresFormat::Markdown => print!("{}", scores_report(&filtered)),
        ScoresFormat::Table => {
            if filtered.is_empty() {
                println!("No scores match the selection.");
                return Ok(());
            }
            println!("{:<8} {:<10} {:>8} {:>12}", "Ticker", "Model", "Horizon", "RMSE");
            println!("{}", "-".repeat(41));
            for row in filtered.rows() {
                println!(
                    "{:<8} {:<10} {:>7}d {:>12.4}",
                    row.ticker, row.model, row.horizon, row.rmse
                );
            }
        }
    }
    Ok(())
}

fn run_summary(config: &DashboardConfig) -> Result<()> {
    let loader = config.loader();
    let results: Vec<(String, Result<Aggregation>)> = config
        .tickers
        .par_iter()
        .map(|ticker| {
            let request =
                AggregationRequest::for_selection(ticker.clone(), &config.models, &config.horizons)
                    .with_baseline(config.baseline)
                    .with_sentiment(config.include_sentiment);
            let result = aggregate(&loader, &request)
                .with_context(|| format!("failed to aggregate {ticker}"));
            (ticker.clone(), result)
        })
        .collect();

    println!(
        "{:<8} {:>6} {:>8} {:<12} {:<10} {:>9}",
        "Ticker", "Rows", "Columns", "Last Fcst", "Sentiment", "Skipped"
    );
    println!("{}", "-".repeat(58));

    let mut failures = 0;
    for (ticker, result) in &results {
        match result {
            Ok(aggregation) => match aggregation.table() {
                Some(table) => println!(
                    "{:<8} {:>6} {:>8} {:<12} {:<10} {:>9}",
                    ticker,
                    table.len(),
                    table.forecast_columns().count(),
                    aggregation
                        .max_forecast_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".into()),
                    aggregation
                        .sentiment_source
                        .map(|s| format!("{s:?}").to_lowercase())
                        .unwrap_or_else(|| "-".into()),
                    aggregation.diagnostics.len(),
                ),
                None => println!("{ticker:<8} (no data)"),
            },
            Err(e) => {
                failures += 1;
                eprintln!("Error for {ticker}: {e:#}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} ticker(s) failed to aggregate");
    }
    Ok(())
}

fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    let toml = DashboardConfig::default().to_toml()?;
    std::fs::write(output, toml)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote default config to {}", output.display());
    Ok(())
}

fn print_table(table: &AlignedTable) {
    println!("{}", table.title());
    println!();

    let names = table.column_names();
    let widths: Vec<usize> = names.iter().map(|n| n.len().max(10)).collect();

    let mut header = format!("{:<10}", "date");
    for (name, width) in names.iter().zip(widths.iter().copied()) {
        header.push_str(&format!("  {name:>width$}"));
    }
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for (i, date) in table.dates().iter().enumerate() {
        let mut line = date.to_string();
        for (column, width) in table.columns().iter().zip(widths.iter().copied()) {
            let cell = column.values()[i]
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default();
            line.push_str(&format!("  {cell:>width$}"));
        }
        println!("{line}");
    }
}
