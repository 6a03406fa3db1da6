//! Regime Backtest CLI
//!
//! # Usage
//!
//! ```bash
//! # Backtest one sensitivity and print the summary
//! regime-backtest run --prices data/spy.csv --ticker spy --sensitivity 3
//!
//! # Same run as JSON, with chart.csv/result.json written under results/
//! regime-backtest run --prices data/spy.parquet --ticker SPY --json --export results
//!
//! # Compare sensitivities 1 through 10
//! regime-backtest sweep --prices data/spy.csv --ticker SPY --from 1 --to 10
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use regime_backtest::backtest::{BacktestConfig, BacktestEngine, BacktestRequest};
use regime_backtest::data::{PriceLoader, PriceSeries};
use regime_backtest::report::{export_json, save_report};
use regime_backtest::settings::load_config;
use regime_backtest::sweep::SensitivitySweep;

#[derive(Parser)]
#[command(name = "regime-backtest")]
#[command(about = "Bull/Bear regime detection and binary allocation backtesting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest
    Run {
        /// Price file (CSV or Parquet) with date and close columns
        #[arg(short, long)]
        prices: PathBuf,

        /// Ticker symbol
        #[arg(short, long)]
        ticker: String,

        /// Regime sensitivity, 1 (fast) to 10 (slow)
        #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=10))]
        sensitivity: u32,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory to write result.json and chart.csv into
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Print the full result as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Run one backtest per sensitivity and rank them
    Sweep {
        /// Price file (CSV or Parquet) with date and close columns
        #[arg(short, long)]
        prices: PathBuf,

        /// Ticker symbol
        #[arg(short, long)]
        ticker: String,

        /// First sensitivity
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=10))]
        from: u32,

        /// Last sensitivity
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=10))]
        to: u32,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("regime_backtest=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            prices,
            ticker,
            sensitivity,
            config,
            export,
            json,
        } => cmd_run(
            &prices,
            &ticker,
            sensitivity,
            config.as_deref(),
            export.as_deref(),
            json,
        ),
        Commands::Sweep {
            prices,
            ticker,
            from,
            to,
            config,
        } => cmd_sweep(&prices, &ticker, from, to, config.as_deref()),
    }
}

fn load_settings(path: Option<&Path>) -> Result<BacktestConfig> {
    load_config(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load default configuration".to_string(),
    })
}

fn load_prices(path: &Path) -> Result<PriceSeries> {
    PriceLoader::new(path)
        .load()
        .with_context(|| format!("Failed to load prices from {}", path.display()))
}

fn normalize_ticker(ticker: &str) -> Result<String> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        bail!("Ticker must not be empty");
    }
    Ok(ticker)
}

fn cmd_run(
    prices_path: &Path,
    ticker: &str,
    sensitivity: u32,
    config_path: Option<&Path>,
    export_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_settings(config_path)?;
    let ticker = normalize_ticker(ticker)?;
    let prices = load_prices(prices_path)?;

    let request = BacktestRequest::new(ticker, sensitivity, prices);
    let result = BacktestEngine::new(config)
        .run(&request)
        .with_context(|| format!("Backtest failed for {}", request.ticker))?;

    if json {
        println!("{}", export_json(&result)?);
    } else {
        println!("{}", result.summary());
    }

    if let Some(dir) = export_dir {
        let run_dir = save_report(&result, dir)
            .with_context(|| format!("Failed to export report to {}", dir.display()))?;
        eprintln!("Report written to {}", run_dir.display());
    }

    Ok(())
}

fn cmd_sweep(
    prices_path: &Path,
    ticker: &str,
    from: u32,
    to: u32,
    config_path: Option<&Path>,
) -> Result<()> {
    if from > to {
        bail!("--from ({}) must not exceed --to ({})", from, to);
    }

    let config = load_settings(config_path)?;
    let ticker = normalize_ticker(ticker)?;
    let prices = load_prices(prices_path)?;

    let template = BacktestRequest::new(ticker, from, prices);
    let result = SensitivitySweep::new(config)
        .run(&template, from..=to)
        .with_context(|| format!("Sensitivity sweep failed for {}", template.ticker))?;

    println!("{}", result.summary());
    Ok(())
}
