//! CLI entry point for the IMDb warehouse ETL.
//!
//! Provides subcommands for the full extract-transform-load run and for the
//! extract and transform halves standalone, which persist their results as
//! local files instead of touching the warehouse.

use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imdb_etl::config::{Config, SinkConfig};
use imdb_etl::extract;
use imdb_etl::fetch::BasicClient;
use imdb_etl::output;
use imdb_etl::pipeline::{Pipeline, Stage};
use imdb_etl::transform;
use imdb_etl::warehouse::bigquery::BigQueryWarehouse;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "imdb_etl")]
#[command(about = "Batch ETL from the public IMDb datasets into BigQuery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract-transform-load pipeline
    Run,
    /// Download the raw datasets and write them to local TSV files
    Extract {
        /// Directory to write the raw TSV files into
        #[arg(short, long, default_value = "raw_data")]
        output_dir: String,
    },
    /// Read previously extracted raw files and write the derived tables as CSV
    Transform {
        /// Directory containing the raw TSV files
        #[arg(short, long, default_value = "raw_data")]
        input_dir: String,
        /// Directory to write the derived CSV files into
        #[arg(short, long, default_value = "transformed_data")]
        output_dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    let config = Config::from_env()?;
    let _file_guard = init_logging(config.debug);

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            // Destination identifiers and credentials are validated before
            // the first network call.
            let sink = SinkConfig::from_env()?;
            let client = BasicClient::new();
            let warehouse = BigQueryWarehouse::connect(&sink).await?;

            let outcome = Pipeline::new(&client, &warehouse, &config, &sink).run().await;
            if outcome == Stage::Failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Extract { output_dir } => {
            let client = BasicClient::new();
            let raw = extract::extract_all(&client, &config.source).await?;
            output::write_raw_tables(&raw, Path::new(&output_dir))?;
        }
        Commands::Transform {
            input_dir,
            output_dir,
        } => {
            let raw = output::read_raw_tables(Path::new(&input_dir))?;
            info!(
                movies = raw.movies.len(),
                ratings = raw.ratings.len(),
                "raw tables read"
            );
            let derived = transform::transform(&raw, &config.runtime_buckets, config.max_year);
            output::write_derived_tables(&derived, Path::new(&output_dir))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging(debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/imdb_etl.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("imdb_etl.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if debug { "debug" } else { "info" };

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(default_level.parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}
