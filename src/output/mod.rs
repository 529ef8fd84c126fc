//! Output module for reporting pipeline results
//!
//! This module handles:
//! - Printing the per-stage counts of a finished run
//! - Reading and displaying database statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, PipelineStatistics};

use crate::pipeline::RunSummary;

/// Prints a finished run's stage counts to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Pipeline Run Summary ===\n");
    println!("  Crawled:      {}", summary.crawled);
    println!("  Raw inserted: {}", summary.raw_inserted);
    println!("  Normalized:   {}", summary.normalized);
    println!("  Dropped:      {}", summary.dropped);
    println!(
        "  Upserted:     {} ({} new, {} updated)",
        summary.upserted(),
        summary.inserted,
        summary.updated
    );
}
