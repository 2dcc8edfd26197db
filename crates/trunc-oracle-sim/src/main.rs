use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trunc_oracle::OracleConfig;
use trunc_oracle_sim::{Scenario, ScenarioKind, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "trunc-oracle-sim")]
#[command(about = "Run truncated oracle scenarios and report how the cap adapts")]
struct Args {
    /// Path to oracle configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Market behavior to simulate
    #[arg(short, long, value_enum, default_value = "volatile")]
    scenario: ScenarioKind,

    /// Number of recorded updates
    #[arg(long, default_value = "24")]
    steps: u32,

    /// Seconds between updates
    #[arg(short, long, default_value = "3600")]
    interval: u32,

    /// Swing size (volatile) or maximum step (random walk) in ticks
    #[arg(long, default_value = "100000")]
    volatility: i32,

    /// In-range liquidity at bootstrap
    #[arg(long, default_value = "1000000000000")]
    liquidity: u128,

    /// Comma-separated liquidity values applied at successive updates, cycled
    #[arg(long, value_delimiter = ',')]
    liquidity_schedule: Vec<u128>,

    /// Random walk seed
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => OracleConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OracleConfig::default(),
    };
    tracing::info!(
        update_source = %config.update_source,
        governance = %config.governance,
        "configuration loaded"
    );

    let scenario = Scenario::new(args.scenario)
        .with_steps(args.steps)
        .with_interval(args.interval)
        .with_volatility(args.volatility)
        .with_liquidity(args.liquidity)
        .with_liquidity_schedule(args.liquidity_schedule)
        .with_seed(args.seed);

    let report = ScenarioRunner::new(config)
        .run(&scenario)
        .context("running scenario")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(())
}
