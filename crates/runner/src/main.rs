//! Command-line backtest runner.
//!
//! Loads a JSON config (or defaults), builds a tick feed from a JSON-lines
//! file or the synthetic generator, runs the engine and writes the report.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mmsim_backtest::{BacktestEngine, MarketDataCache, NoopCache, SqliteCache};
use mmsim_core::config::StrategyConfig;
use mmsim_core::{Config, MarketData};
use mmsim_ingestion::{load_json_lines, SyntheticConfig, SyntheticFeed};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mmsim-runner")]
#[command(about = "Tick-driven market-making backtest", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines tick file
    #[arg(short, long, conflicts_with = "synthetic")]
    ticks: Option<PathBuf>,

    /// Generate N synthetic ticks per symbol
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Seed for the synthetic feed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Stop after this many wall-clock seconds
    #[arg(long)]
    budget_secs: Option<f64>,

    /// Cache ticks and trades in a SQLite file
    #[arg(long)]
    sqlite_cache: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_feed(cli: &Cli) -> Result<Box<dyn Iterator<Item = MarketData>>> {
    if let Some(path) = &cli.ticks {
        let (ticks, stats) = load_json_lines(path)
            .with_context(|| format!("failed to load ticks from {}", path.display()))?;
        if !stats.is_ordered() {
            warn!(out_of_order = stats.out_of_order, "tick file is not time-ordered");
        }
        return Ok(Box::new(ticks.into_iter()));
    }

    let mut synthetic = SyntheticConfig {
        seed: cli.seed,
        ..Default::default()
    };
    if let Some(n) = cli.synthetic {
        synthetic.ticks_per_symbol = n;
    }
    let feed = SyntheticFeed::new(synthetic)?;
    info!(ticks = feed.total_ticks(), seed = cli.seed, "Using synthetic feed");
    Ok(Box::new(feed))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => Config::default(),
    };

    let ticks: Vec<MarketData> = build_feed(&cli)?.collect();
    if ticks.is_empty() {
        bail!("tick feed is empty");
    }
    if config.strategies.is_empty() {
        let symbols: BTreeSet<&str> = ticks.iter().map(|t| t.symbol.as_str()).collect();
        info!(symbols = symbols.len(), "No strategies configured, quoting every symbol");
        config.strategies = symbols.into_iter().map(StrategyConfig::new).collect();
    }

    let cache: Box<dyn MarketDataCache> = match &cli.sqlite_cache {
        Some(path) => {
            let mut sqlite = SqliteCache::open(path)
                .with_context(|| format!("failed to open cache {}", path.display()))?;
            let purged = sqlite.purge_expired()?;
            info!(path = %path.display(), purged, "Opened SQLite cache");
            Box::new(sqlite)
        }
        None => Box::new(NoopCache),
    };

    let mut engine = BacktestEngine::new(&config, cache)?;
    let metrics = match cli.budget_secs {
        Some(secs) => {
            let budget = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid --budget-secs {secs}"))?;
            engine.run_with_budget(ticks, budget)
        }
        None => engine.run(ticks),
    };

    info!(
        trades = metrics.total_trades,
        hit_rate_pct = metrics.hit_rate * 100.0,
        total_pnl = metrics.total_pnl,
        unrealized_pnl = metrics.unrealized_pnl,
        max_drawdown = metrics.max_drawdown,
        sharpe = metrics.sharpe_ratio,
        throughput_ops_sec = metrics.throughput_ops_sec,
        "Summary"
    );

    let report = engine.report();
    match &cli.report {
        Some(path) => {
            report
                .write_json(path)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", report.to_json()?),
    }

    Ok(())
}
