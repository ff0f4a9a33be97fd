//! PubMed Harvester main entry point
//!
//! This is the command-line interface for the bulk record harvester.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use pubmed_harvester::config::{parse_config_with_hash, validate, Config};
use pubmed_harvester::harvest::{planned_windows, run_harvest};
use pubmed_harvester::output::{load_statistics, print_report, print_statistics};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// PubMed Harvester: bulk bibliographic-record downloader
///
/// Collects every identifier matching a query (splitting the date range into
/// windows to get past the per-query result cap), then fetches the full
/// records in batches into a resumable JSON file.
#[derive(Parser, Debug)]
#[command(name = "pubmed-harvester")]
#[command(version)]
#[command(about = "Bulk PubMed record harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Search query
    #[arg(long)]
    query: Option<String>,

    /// First publication date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", conflicts_with = "start_year")]
    start_date: Option<NaiveDate>,

    /// Last publication date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", conflicts_with = "end_year")]
    end_date: Option<NaiveDate>,

    /// First publication year (from January 1st)
    #[arg(long, value_name = "YEAR")]
    start_year: Option<i32>,

    /// Last publication year (through December 31st)
    #[arg(long, value_name = "YEAR")]
    end_year: Option<i32>,

    /// Width of each date window in days
    #[arg(long, value_name = "DAYS")]
    window_days: Option<u32>,

    /// Split windows that exceed the result cap instead of truncating them
    #[arg(long)]
    split_oversized: bool,

    /// Max number of records to fetch when no date range is given
    #[arg(long, value_name = "N")]
    retmax: Option<u32>,

    /// Output file path (also the resume checkpoint)
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// NCBI API key
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Also append log lines to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the window plan without making requests
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the existing output file and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = parse_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli)?;

    if cli.stats {
        return handle_stats(&config);
    }

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pubmed_harvester=info,warn"),
            1 => EnvFilter::new("pubmed_harvester=debug,info"),
            2 => EnvFilter::new("pubmed_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Applies command-line values on top of the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(query) = &cli.query {
        config.query.term = query.clone();
    }

    if let Some(year) = cli.start_year {
        config.query.start_date = Some(
            NaiveDate::from_ymd_opt(year, 1, 1)
                .with_context(|| format!("invalid start year {}", year))?,
        );
    }
    if let Some(year) = cli.end_year {
        config.query.end_date = Some(
            NaiveDate::from_ymd_opt(year, 12, 31)
                .with_context(|| format!("invalid end year {}", year))?,
        );
    }
    if cli.start_date.is_some() {
        config.query.start_date = cli.start_date;
    }
    if cli.end_date.is_some() {
        config.query.end_date = cli.end_date;
    }

    if let Some(days) = cli.window_days {
        config.query.window_days = days;
    }
    if cli.split_oversized {
        config.query.split_oversized_windows = true;
    }
    if let Some(retmax) = cli.retmax {
        config.query.max_results = retmax;
    }
    if let Some(output) = &cli.output {
        config.output.records_path = output.clone();
    }

    match cli.api_key.as_deref().map(str::trim) {
        Some("") => {}
        Some(key) => config.endpoint.api_key = Some(key.to_string()),
        None => {}
    }
    if config.endpoint.api_key.is_none() {
        tracing::info!("No API key configured, using the unauthenticated rate limit");
    }

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows the window plan
fn handle_dry_run(config: &Config) {
    println!("=== PubMed Harvester Dry Run ===\n");

    println!("Query:");
    println!("  Term: {}", config.query.term);
    println!("  Result cap per query: {}", config.endpoint.result_cap);

    match planned_windows(config) {
        Some(windows) => {
            println!(
                "\nWindows ({} of up to {} days):",
                windows.len(),
                config.query.window_days
            );
            for window in &windows {
                println!("  - {}", window);
            }
        }
        None => {
            println!(
                "\nSingle query, max {} results",
                config.query.max_results.min(config.endpoint.result_cap)
            );
        }
    }

    println!("\nEndpoints:");
    println!("  Search: {}", config.endpoint.search_url);
    println!("  Fetch: {}", config.endpoint.fetch_url);
    println!(
        "  API key: {}",
        if config.endpoint.api_key.is_some() {
            "set"
        } else {
            "not set"
        }
    );

    println!("\nPacing:");
    println!(
        "  Page size: {} ({}ms between pages)",
        config.pacing.page_size, config.pacing.page_delay_ms
    );
    println!(
        "  Batch size: {} ({}ms between batches)",
        config.pacing.batch_size, config.pacing.batch_delay_ms
    );
    println!(
        "  Retries: {} (backoff {}ms up to {}ms)",
        config.retry.max_retries, config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nOutput:");
    println!("  Records: {}", config.output.records_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarizes the existing output file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Records: {}\n", config.output.records_path);

    let stats = load_statistics(Path::new(&config.output.records_path))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    let records_path = config.output.records_path.clone();
    tracing::info!("Started query: {:?}", config.query.term);

    match run_harvest(config).await {
        Ok(report) => {
            print_report(&report, &records_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
