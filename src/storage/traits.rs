//! Storage traits and error types
//!
//! This module defines the persistence gateway the pipeline writes through and the
//! errors it can raise.

use crate::pipeline::RunSummary;
use crate::record::{NormalizedRecord, RawRecord, StoredRawRow};
use crate::storage::{ProductRecord, RunRecord, UpsertReport};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence gateway for raw and canonical records
///
/// Every batch write is all-or-nothing: either the whole slice is stored or none of it.
pub trait Storage {
    // ===== Raw Audit =====

    /// Appends every record to the audit table with its arrival timestamp
    ///
    /// Never deduplicates. Returns the number of rows inserted.
    fn insert_raw(&mut self, records: &[RawRecord]) -> StorageResult<usize>;

    /// Reads back every audit row, oldest first
    fn load_raw_rows(&self) -> StorageResult<Vec<StoredRawRow>>;

    /// Counts audit rows
    fn count_raw(&self) -> StorageResult<u64>;

    // ===== Canonical Records =====

    /// Inserts or updates canonical records matched by product URL
    ///
    /// An existing record has every mutable field overwritten; a new URL creates a
    /// record. Duplicate URLs within one batch are applied in order.
    fn upsert(&mut self, records: &[NormalizedRecord]) -> StorageResult<UpsertReport>;

    /// Checks whether a canonical record exists for this product URL
    fn record_exists(&self, product_url: &str) -> StorageResult<bool>;

    /// Gets the canonical record for a product URL
    fn get_product(&self, product_url: &str) -> StorageResult<Option<ProductRecord>>;

    /// Counts canonical records
    fn count_products(&self) -> StorageResult<u64>;

    // ===== Run Ledger =====

    /// Opens a run entry and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run as completed with its stage counts
    fn complete_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()>;

    /// Closes a run as failed
    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
