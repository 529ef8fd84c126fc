//! Catalog-ETL: a small extract-transform-load pipeline for paginated catalog sites
//!
//! This crate crawls a paginated product catalog, keeps an append-only audit copy of
//! every scraped record, normalizes loosely formatted text fields into typed values and
//! upserts canonical records keyed by product URL.

pub mod config;
pub mod crawler;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-ETL operations
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// A single HTTP GET that failed
///
/// The fetcher retries every variant; once attempts are exhausted the last error
/// is handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// The URL the failed request was aimed at
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. } | Self::Timeout { url } | Self::Status { url, .. } => url,
        }
    }
}

/// Result type alias for Catalog-ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use normalize::{normalize_availability, normalize_price, normalize_rating, normalize_row};
pub use pipeline::{Pipeline, RunSummary};
pub use record::{NormalizedRecord, RawRating, RawRecord, RawRow, StoredRawRow};
