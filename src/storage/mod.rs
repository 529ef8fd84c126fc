//! Storage module for persisting pipeline data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Append-only audit copies of raw scraped records
//! - Canonical records upserted by product URL
//! - A ledger of pipeline runs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::record::NormalizedRecord;

/// Outcome of one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertReport {
    /// Records processed: inserted plus updated
    pub fn processed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Represents a canonical product in the database
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: i64,
    pub title: String,
    pub price: Option<f64>,
    pub rating: Option<u8>,
    pub availability: Option<u32>,
    pub category: Option<String>,
    pub product_url: String,
    pub first_seen_at: String,
    pub updated_at: String,
}

impl ProductRecord {
    /// The stored values without bookkeeping columns
    pub fn to_normalized(&self) -> NormalizedRecord {
        NormalizedRecord {
            title: self.title.clone(),
            price: self.price,
            rating: self.rating,
            availability: self.availability,
            category: self.category.clone(),
            product_url: self.product_url.clone(),
        }
    }
}

/// Represents a pipeline run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub crawled: Option<i64>,
    pub raw_inserted: Option<i64>,
    pub normalized: Option<i64>,
    pub dropped: Option<i64>,
    pub upserted: Option<i64>,
    pub error_message: Option<String>,
}

/// Status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
