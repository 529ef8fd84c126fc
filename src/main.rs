//! Catalog-ETL main entry point
//!
//! This is the command-line interface for the Catalog-ETL pipeline.

use catalog_etl::config::{load_config_with_hash, Config};
use catalog_etl::output::{load_statistics, print_run_summary, print_statistics};
use catalog_etl::storage::SqliteStorage;
use catalog_etl::Pipeline;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-ETL: crawl, audit, normalize and load a product catalog
///
/// Catalog-ETL walks a paginated catalog site, stores every scraped record
/// verbatim, normalizes price, rating and availability text into typed values
/// and upserts one canonical record per product URL.
#[derive(Parser, Debug)]
#[command(name = "catalog-etl")]
#[command(version)]
#[command(about = "A small ETL pipeline for paginated product catalogs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the number of listing pages to crawl
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the listing path the crawl starts from
    #[arg(long, value_name = "PATH")]
    start_path: Option<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "renormalize"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "renormalize"])]
    stats: bool,

    /// Re-normalize stored raw rows without crawling
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    renormalize: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(max_pages) = cli.max_pages {
        config.site.max_pages = max_pages;
    }
    if let Some(start_path) = cli.start_path {
        config.site.start_path = start_path;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.renormalize {
        handle_renormalize(config, config_hash)?;
    } else {
        handle_run(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_etl=info,warn"),
            1 => EnvFilter::new("catalog_etl=debug,info"),
            2 => EnvFilter::new("catalog_etl=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-ETL Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Start path: {}", config.site.start_path);
    println!("  Max pages: {}", config.site.max_pages);

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Backoff unit: {}ms", config.fetch.backoff_unit_ms);
    println!(
        "  Politeness: {}ms + up to {}ms jitter",
        config.fetch.politeness_delay_ms, config.fetch.politeness_jitter_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --renormalize mode: rebuilds canonical records from the audit table
fn handle_renormalize(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let mut pipeline = Pipeline::new(config, storage, config_hash);

    let summary = pipeline.renormalize()?;
    print_run_summary(&summary);

    Ok(())
}

/// Handles the main pipeline run
async fn handle_run(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} from {} (max {} pages)",
        config.site.base_url,
        config.site.start_path,
        config.site.max_pages
    );

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let mut pipeline = Pipeline::new(config, storage, config_hash);

    match pipeline.run().await {
        Ok(summary) => {
            tracing::info!("Pipeline completed successfully");
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            Err(e.into())
        }
    }
}
