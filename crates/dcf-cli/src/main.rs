//! Command-line interface for single-ticker DCF valuation

use anyhow::Context;
use clap::Parser;
use dcf_utils::{LogConfig, RunContext, init_session_logging};
use dcf_valuation::{Driver, ValuationConfig, Valuator, YahooFinanceClient, load_tickers};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dcf")]
#[command(about = "Estimate intrinsic value per share with a discounted cash flow model", long_about = None)]
struct Args {
    /// Ranking CSV with a `Symbol` column
    #[arg(long)]
    ranking: Option<PathBuf>,

    /// Directory for session log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Seconds to wait after a rate-limited attempt
    #[arg(long)]
    retry_wait: Option<u64>,

    /// Attempts per ticker before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Value this ticker and exit instead of prompting
    #[arg(short, long)]
    ticker: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut log_config = LogConfig::default().with_env();
    if let Some(dir) = args.log_dir {
        log_config = log_config.log_dir(dir);
    }
    let ctx = RunContext::new(&log_config.log_dir);
    init_session_logging(&ctx, &log_config)?;
    println!("Logging to {}", ctx.log_path().display());

    let mut config = ValuationConfig::default()
        .with_env()
        .context("Invalid environment configuration")?;
    if let Some(path) = args.ranking {
        config.ranking_path = path;
    }
    if let Some(secs) = args.retry_wait {
        config.retry_wait = Duration::from_secs(secs);
    }
    if let Some(attempts) = args.max_attempts {
        config.max_attempts = attempts;
    }
    config.validate()?;

    info!(
        session_id = %ctx.session_id(),
        started_at = %ctx.started_at(),
        "Starting dcf session"
    );

    let tickers = load_tickers(&config.ranking_path).unwrap_or_else(|e| {
        println!("Error: {e}");
        Vec::new()
    });
    println!("Loaded Tickers: {tickers:?}");

    let client = YahooFinanceClient::new(&config).context("Failed to create Yahoo Finance client")?;
    let mut driver = Driver::new(Valuator::new(client, config, ctx));
    let mut stdout = std::io::stdout();

    match args.ticker {
        Some(ticker) => {
            driver.process_ticker(&ticker, &mut stdout).await?;
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            driver.run(stdin, &mut stdout).await?;
        }
    }

    Ok(())
}
