//! Statistics generation from the pipeline database
//!
//! This module provides functionality for extracting and displaying
//! pipeline statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct PipelineStatistics {
    /// Rows in the append-only audit table
    pub raw_rows: u64,

    /// Canonical records, one per product URL
    pub products: u64,

    /// Most recent run, if any run was ever recorded
    pub latest_run: Option<RunRecord>,
}

impl PipelineStatistics {
    /// Average number of times each product has been scraped
    pub fn scrapes_per_product(&self) -> f64 {
        if self.products == 0 {
            0.0
        } else {
            self.raw_rows as f64 / self.products as f64
        }
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<PipelineStatistics> {
    Ok(PipelineStatistics {
        raw_rows: storage.count_raw()?,
        products: storage.count_products()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &PipelineStatistics) {
    println!("=== Pipeline Statistics ===\n");

    println!("Overview:");
    println!("  Raw audit rows: {}", stats.raw_rows);
    println!("  Canonical products: {}", stats.products);
    println!("  Scrapes per product: {:.2}", stats.scrapes_per_product());
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Config hash: {}", run.config_hash);
            print_count("Crawled", run.crawled);
            print_count("Raw inserted", run.raw_inserted);
            print_count("Normalized", run.normalized);
            print_count("Dropped", run.dropped);
            print_count("Upserted", run.upserted);
            if let Some(error) = &run.error_message {
                println!("  Error: {}", error);
            }
        }
        None => println!("No pipeline runs recorded yet"),
    }
}

fn print_count(label: &str, value: Option<i64>) {
    if let Some(value) = value {
        println!("  {}: {}", label, value);
    }
}
