//! CLI entry point for the Belgian COVID-19 chart tool.
//!
//! Provides subcommands for downloading the Sciensano datasets, writing
//! static charts, and serving the interactive dashboards.

use anyhow::Result;
use clap::{Parser, Subcommand};
use covid19be::{
    charts::ChartFormat,
    dashboard::{self, DEFAULT_PORT, DashboardData, DashboardKind},
    datasets::download_all,
    fetch::BasicClient,
    load::{CleanOptions, MissingCategory},
    records::MISSING,
    reports::{Report, write_report},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "covid19be")]
#[command(about = "Charts and dashboards for the Sciensano COVID-19 datasets", long_about = None)]
struct Cli {
    /// Directory holding the downloaded CSV files
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Drop rows with a missing province, region, age group or sex instead
    /// of labelling them "NA"
    #[arg(long, global = true, default_value_t = false)]
    drop_missing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every published dataset into the data directory
    Download,
    /// Write the static charts for one dataset
    Plot {
        #[arg(value_enum)]
        report: Report,

        /// Directory to write chart files to
        #[arg(short, long, default_value = "charts")]
        out_dir: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ChartFormat::Svg)]
        format: ChartFormat,
    },
    /// Serve an interactive dashboard on localhost
    Serve {
        #[arg(value_enum)]
        dashboard: DashboardKind,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/covid19be.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("covid19be.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let options = CleanOptions {
        missing_category: if cli.drop_missing {
            MissingCategory::Drop
        } else {
            MissingCategory::Sentinel(MISSING.to_string())
        },
    };

    match cli.command {
        Commands::Download => {
            let client =
                BasicClient::with_timeouts(Duration::from_secs(10), Duration::from_secs(120))?;
            download_all(&client, &cli.data_dir).await?;
        }
        Commands::Plot {
            report,
            out_dir,
            format,
        } => {
            let paths = write_report(report, &cli.data_dir, &out_dir, format, &options)?;
            info!(charts = paths.len(), out_dir = %out_dir.display(), "Charts ready");
        }
        Commands::Serve {
            dashboard: kind,
            port,
        } => {
            let data = DashboardData::load(kind, &cli.data_dir, &options)?;
            dashboard::serve(data, port).await?;
        }
    }

    Ok(())
}
