//! Geodemand CLI
//!
//! Batch front end for the demand indices:
//! - Report records or per-slot aggregates by time or geohash
//! - Print ingestion and index statistics
//! - Generate a default config file

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use geodemand::config::{self, Config, LogFormat, LoggingConfig};
use geodemand::{IndexManager, InputSet, ReportFormat, Reporter, Resolution, View};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "geodemand")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Index geo-tagged demand records by time and geohash")]
#[command(long_about = "Geodemand reads KEY,DAY,HH:MM,VALUE records, indexes them by day, hour,\nquarter-hour and geohash, and reports them in index order.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/geodemand/config.toml or ./geodemand.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct InputArgs {
    /// Input files, read in order (default: stdin)
    pub files: Vec<PathBuf>,

    /// Only index these geohashes in the geohash index (comma-separated)
    #[arg(short, long)]
    pub geohashes: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest input and print records in index order
    Report {
        #[command(flatten)]
        input: InputArgs,
        /// Index to walk (time, geohash)
        #[arg(long)]
        view: Option<View>,
        /// Time resolution (day, hour, quarter)
        #[arg(short, long)]
        resolution: Option<Resolution>,
        /// First slot to report (0-based, inclusive)
        #[arg(long)]
        from: Option<usize>,
        /// Last slot to report (0-based, inclusive)
        #[arg(long)]
        to: Option<usize>,
        /// Geohash view: only these keys
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Output format (records, summary, json)
        #[arg(short, long)]
        format: Option<ReportFormat>,
        /// Walk each slot oldest block first
        #[arg(long)]
        chronological: bool,
    },

    /// Ingest input and print ingestion and index statistics
    Stats {
        #[command(flatten)]
        input: InputArgs,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("geodemand: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("geodemand: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    match path {
        Some(path) => Config::load_with_env(path),
        None => Config::load_default(),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("geodemand={}", logging.level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Report {
            input,
            view,
            resolution,
            from,
            to,
            keys,
            format,
            chronological,
        } => {
            let mut options = config.report_options();
            if let Some(view) = view {
                options.view = view;
            }
            if let Some(resolution) = resolution {
                options.resolution = resolution;
            }
            if let Some(format) = format {
                options.format = format;
            }
            options.from = from;
            options.to = to;
            options.keys = config::parse_geohash_list(&keys)?;
            options.chronological |= chronological;

            let manager = build_index(&input, &config)?;

            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            Reporter::new(&manager)
                .render(&mut out, &options)
                .context("Failed to write report")?;
        }

        Commands::Stats { input, json } => {
            let manager = build_index(&input, &config)?;
            let ingest = manager.ingest_stats();
            let index = manager.index_stats();

            if json {
                let body = serde_json::json!({
                    "ingest": ingest,
                    "index": index,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Geodemand v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Lines read:         {}", ingest.lines_read);
                println!("Records accepted:   {}", ingest.records_accepted);
                println!("Lines rejected:     {}", ingest.rejected_total());
                for (kind, count) in &ingest.rejected {
                    println!("  {:<16} {}", kind, count);
                }
                if manager.is_filtering() {
                    println!("Geohash excluded:   {}", ingest.geohash_excluded);
                }
                println!();
                println!("{}", index);
            }
        }

        Commands::Config { output } => {
            let content = config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    let mut out = std::io::stdout();
                    out.write_all(content.as_bytes())?;
                }
            }
        }
    }

    Ok(())
}

/// Open every input, then run the ingestion pass
fn build_index(input: &InputArgs, config: &Config) -> anyhow::Result<IndexManager> {
    let index_config = config.index_config_with(input.geohashes.as_deref())?;

    let inputs = InputSet::open(&input.files)?;
    tracing::info!("Reading {} input(s)", inputs.len());

    let mut manager = IndexManager::with_config(index_config)?;
    manager.ingest(inputs)?;

    tracing::info!("Index built: {} records", manager.store().len());
    Ok(manager)
}
