//! Backtest driver binary
//!
//! Runs one mean-reversion backtest over a quote file, prints the metrics
//! block to standard output and writes the equity-curve and trade-log CSVs.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reversion_lab::backtesting::{BacktestConfig, Backtester};
use reversion_lab::pipeline::{self, DEFAULT_RING_CAPACITY};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the quote CSV file (timestamp,bid,ask,volume)
    #[arg(default_value = "data/ES_futures_sample.csv")]
    data_file: PathBuf,

    /// Entry threshold in rolling standard deviations
    #[arg(default_value_t = 2.5)]
    threshold: f64,

    /// Output prefix for <prefix>.csv and <prefix>_trades.csv
    #[arg(short, long, default_value = "backtest_results")]
    prefix: String,

    /// Run the reader and compute stages on separate threads
    #[arg(long)]
    piped: bool,

    /// CPU core to pin the compute thread to (piped mode only)
    #[arg(short = 'c', long)]
    pinned_core: Option<usize>,

    /// Ring capacity for piped mode; must be a power of two
    #[arg(long, default_value_t = DEFAULT_RING_CAPACITY)]
    ring_capacity: usize,

    /// JSON file overriding the backtest configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append log records to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(false))
                .with(filter)
                .init();
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(BacktestConfig::default()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_ref())?;

    let config = load_config(args.config.as_ref())?;
    let mut backtester = Backtester::new(config);

    let metrics = if args.piped {
        pipeline::run_piped(
            &mut backtester,
            &args.data_file,
            args.threshold,
            args.ring_capacity,
            args.pinned_core,
        )?
    } else {
        backtester.run(&args.data_file, args.threshold)?
    };

    backtester
        .write_results(&args.prefix)
        .context("writing result files")?;

    println!("{}", metrics.summary());
    Ok(())
}
