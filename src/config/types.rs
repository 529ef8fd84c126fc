use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Catalog-ETL
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// The catalog site being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root of the catalog; every relative path is resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// First listing page, relative to the base URL
    #[serde(rename = "start-path", default = "default_start_path")]
    pub start_path: String,

    /// Upper bound on listing pages fetched in one crawl
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

/// Retry, timeout and politeness settings for outbound requests
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit (milliseconds); the wait after failed attempt `n` is `unit * 2^n`
    #[serde(rename = "backoff-unit-ms", default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Fixed part of the pause between listing pages (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Upper bound of the random part of the pause (milliseconds, exclusive)
    #[serde(rename = "politeness-jitter-ms", default = "default_politeness_jitter_ms")]
    pub politeness_jitter_ms: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
            politeness_delay_ms: default_politeness_delay_ms(),
            politeness_jitter_ms: default_politeness_jitter_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_start_path() -> String {
    "index.html".to_string()
}

fn default_max_pages() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_politeness_delay_ms() -> u64 {
    1000
}

fn default_politeness_jitter_ms() -> u64 {
    1000
}
