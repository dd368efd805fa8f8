//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest catalog crawler.

use anyhow::{bail, Context};
use clap::Parser;
use listing_harvest::catalog::{HttpFetcherFactory, Query, ScraperExtractor};
use listing_harvest::config::{load_config_with_hash, validate, Config, QueryEntry};
use listing_harvest::crawler::{CrawlOrchestrator, OrchestratorSettings};
use listing_harvest::output::{print_plan, print_report};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a resumable crawler for capped listing catalogs
///
/// Listing-Harvest splits catalog searches into partitions that stay under the
/// site's page cap, walks them while backing off from anti-bot responses, and
/// appends every listing it has not seen before to a per-query destination.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable crawler for capped listing catalogs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Base query URL to crawl instead of the configured ones (repeatable)
    #[arg(long = "query", value_name = "URL")]
    queries: Vec<String>,

    /// Directory for default destinations
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Highest page index walked in any partition
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Plan partitions and print them without walking any pages
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let queries = config
        .query
        .iter()
        .map(|entry| Query::parse(&entry.url))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid base query")?;

    if queries.is_empty() {
        bail!("No base queries: add [[query]] entries to the config or pass --query");
    }

    let extractor = ScraperExtractor::new(&config.selectors)?;
    let factory = HttpFetcherFactory::new(config.fetcher.clone());
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(factory),
        Arc::new(extractor),
        OrchestratorSettings::from(&config),
    );

    if cli.dry_run {
        return handle_dry_run(&orchestrator, &queries).await;
    }

    handle_crawl(&orchestrator, &config, queries, cli.max_pages).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, if any, and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if !cli.queries.is_empty() {
        config.query = cli
            .queries
            .iter()
            .map(|url| QueryEntry {
                url: url.clone(),
                destination: None,
            })
            .collect();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: prints the partitions of every base query
async fn handle_dry_run(
    orchestrator: &CrawlOrchestrator,
    queries: &[Query],
) -> anyhow::Result<ExitCode> {
    println!("=== Listing-Harvest Dry Run ===\n");

    let mut failed = false;
    for query in queries {
        match orchestrator.plan(query).await {
            Ok(plan) => print_plan(&query.to_string(), &plan),
            Err(e) => {
                tracing::error!("Cannot plan {}: {}", query, e);
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Handles the main crawl operation
async fn handle_crawl(
    orchestrator: &CrawlOrchestrator,
    config: &Config,
    queries: Vec<Query>,
    max_pages: Option<u32>,
) -> anyhow::Result<ExitCode> {
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next page boundary");
            cancel.cancel();
        }
    });

    let page_cap = max_pages.unwrap_or(config.crawler.max_pages);
    tracing::info!(
        "Starting crawl of {} base queries (page cap {})",
        queries.len(),
        page_cap
    );

    let report = orchestrator
        .run(queries, |index, _| config.target_for(index), page_cap)
        .await;
    print_report(&report);

    if report.any_failed() {
        tracing::error!("{} base queries failed", report.failed());
        return Ok(ExitCode::FAILURE);
    }
    if report.was_cancelled() {
        tracing::info!("Crawl cancelled; rerun to resume");
    } else {
        tracing::info!("Crawl completed successfully");
    }
    Ok(ExitCode::SUCCESS)
}
