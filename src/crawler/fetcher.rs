//! HTTP fetcher implementation
//!
//! This module owns the network session used by a crawl:
//! - Building the HTTP client with the identifying user agent
//! - Single GET requests with a per-request timeout
//! - Retrying failed requests with exponential backoff

use crate::config::{FetchConfig, UserAgentConfig};
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client carrying the crawler's user agent on every request
///
/// # Example
///
/// ```no_run
/// use catalog_etl::config::UserAgentConfig;
/// use catalog_etl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CatalogBot".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Delay to wait after failed attempt `attempt` (counted from 1): `unit * 2^attempt`
pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt))
}

/// A single network session with retry policy
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Connection failure | Retry |
/// | Timeout | Retry |
/// | Non-2xx status | Retry |
/// | Attempts exhausted | Return the last error |
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    max_attempts: u32,
    backoff_unit: Duration,
}

impl Fetcher {
    /// Creates a fetcher and its underlying HTTP session
    pub fn new(config: &FetchConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent)?,
            timeout: config.timeout(),
            max_attempts: config.max_attempts.max(1),
            backoff_unit: config.backoff_unit(),
        })
    }

    /// Fetches `url` with the configured timeout
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_with_timeout(url, self.timeout).await
    }

    /// Fetches `url`, retrying until it succeeds or attempts run out
    pub async fn fetch_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let mut attempt = 1;

        loop {
            match self.fetch_once(url, timeout).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::debug!("Fetched {} on attempt {}", url, attempt);
                    }
                    return Ok(body);
                }
                Err(e) if attempt >= self.max_attempts => {
                    tracing::error!("Failed to fetch {} after {} attempts: {}", url, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff_delay(self.backoff_unit, attempt);
                    tracing::warn!(
                        "Fetch failed (attempt {}/{}) for {}, retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify(url, e))
    }
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
