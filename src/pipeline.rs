//! Pipeline orchestration
//!
//! A run moves through four stages in a fixed order, each consuming the previous
//! stage's full output:
//!
//! ```text
//! CRAWL -> INSERT_RAW -> NORMALIZE -> UPSERT
//! ```
//!
//! The first failing stage aborts the run; the run ledger records the failure and the
//! error propagates to the caller without a summary.

use std::fmt;

use crate::config::Config;
use crate::crawler::Crawler;
use crate::normalize::try_normalize_row;
use crate::record::{NormalizedRecord, RawRow};
use crate::storage::{Storage, UpsertReport};
use crate::Result;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Crawl,
    InsertRaw,
    Normalize,
    Upsert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crawl => "CRAWL",
            Self::InsertRaw => "INSERT_RAW",
            Self::Normalize => "NORMALIZE",
            Self::Upsert => "UPSERT",
        };
        f.write_str(name)
    }
}

/// Per-stage counts of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records produced by the crawl
    pub crawled: usize,
    /// Rows appended to the raw audit table
    pub raw_inserted: usize,
    /// Records that survived normalization
    pub normalized: usize,
    /// Records dropped for a missing title or URL
    pub dropped: usize,
    /// Canonical records created
    pub inserted: usize,
    /// Canonical records overwritten
    pub updated: usize,
}

impl RunSummary {
    /// Records processed by the upsert stage
    pub fn upserted(&self) -> usize {
        self.inserted + self.updated
    }

    fn record_upsert(&mut self, report: UpsertReport) {
        self.inserted = report.inserted;
        self.updated = report.updated;
    }
}

/// Wires the crawler, normalizer and storage together
pub struct Pipeline<S: Storage> {
    config: Config,
    storage: S,
    config_hash: String,
}

impl<S: Storage> Pipeline<S> {
    pub fn new(config: Config, storage: S, config_hash: impl Into<String>) -> Self {
        Self {
            config,
            storage,
            config_hash: config_hash.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Runs every stage using the configured start path and page budget
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start_path = self.config.site.start_path.clone();
        let max_pages = self.config.site.max_pages;
        self.run_from(&start_path, max_pages).await
    }

    /// Runs every stage from an explicit start path and page budget
    pub async fn run_from(&mut self, start_path: &str, max_pages: u32) -> Result<RunSummary> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!("Starting pipeline run {}", run_id);

        let outcome = self.execute(start_path, max_pages).await;
        self.close_run(run_id, outcome)
    }

    /// Re-normalizes every stored raw row and upserts the result
    ///
    /// Skips CRAWL and INSERT_RAW; useful after the normalization rules change.
    pub fn renormalize(&mut self) -> Result<RunSummary> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!("Starting re-normalization run {}", run_id);

        let outcome = self.execute_renormalize();
        self.close_run(run_id, outcome)
    }

    async fn execute(&mut self, start_path: &str, max_pages: u32) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        tracing::info!("Stage {}: {} (max {} pages)", Stage::Crawl, start_path, max_pages);
        let mut crawler = Crawler::from_config(&self.config)?;
        let records = crawler
            .crawl(start_path, max_pages)?
            .collect_records()
            .await?;
        summary.crawled = records.len();

        tracing::info!("Stage {}: {} records", Stage::InsertRaw, records.len());
        summary.raw_inserted = self.storage.insert_raw(&records)?;

        let rows: Vec<RawRow> = records.into_iter().map(RawRow::from).collect();
        let normalized = normalize_all(&rows, &mut summary);

        self.upsert_stage(&normalized, &mut summary)?;
        Ok(summary)
    }

    fn execute_renormalize(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let rows: Vec<RawRow> = self
            .storage
            .load_raw_rows()?
            .into_iter()
            .map(RawRow::from)
            .collect();
        let normalized = normalize_all(&rows, &mut summary);

        self.upsert_stage(&normalized, &mut summary)?;
        Ok(summary)
    }

    fn upsert_stage(
        &mut self,
        records: &[NormalizedRecord],
        summary: &mut RunSummary,
    ) -> Result<()> {
        tracing::info!("Stage {}: {} records", Stage::Upsert, records.len());
        let report = self.storage.upsert(records)?;
        summary.record_upsert(report);
        Ok(())
    }

    fn close_run(&mut self, run_id: i64, outcome: Result<RunSummary>) -> Result<RunSummary> {
        match outcome {
            Ok(summary) => {
                self.storage.complete_run(run_id, &summary)?;
                tracing::info!(
                    "Run {} completed: crawled={} raw={} normalized={} dropped={} inserted={} updated={}",
                    run_id,
                    summary.crawled,
                    summary.raw_inserted,
                    summary.normalized,
                    summary.dropped,
                    summary.inserted,
                    summary.updated
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Run {} failed: {}", run_id, e);
                if let Err(ledger_error) = self.storage.fail_run(run_id, &e.to_string()) {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, ledger_error);
                }
                Err(e)
            }
        }
    }
}

fn normalize_all(rows: &[RawRow], summary: &mut RunSummary) -> Vec<NormalizedRecord> {
    tracing::info!("Stage {}: {} rows", Stage::Normalize, rows.len());

    let mut normalized = Vec::with_capacity(rows.len());
    for row in rows {
        match try_normalize_row(row) {
            Ok(record) => normalized.push(record),
            Err(reason) => {
                summary.dropped += 1;
                tracing::debug!("Dropping row {:?}: {}", row.fields().product_url, reason);
            }
        }
    }

    summary.normalized = normalized.len();
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, OutputConfig, SiteConfig, UserAgentConfig};
    use crate::record::{RawRating, RawRecord};
    use crate::storage::{RunStatus, SqliteStorage};
    use crate::{EtlError, FetchError};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(base_url: &str) -> Config {
        Config {
            site: SiteConfig {
                base_url: base_url.to_string(),
                start_path: "index.html".to_string(),
                max_pages: 1,
            },
            fetch: FetchConfig {
                timeout_secs: 5,
                max_attempts: 1,
                backoff_unit_ms: 1,
                politeness_delay_ms: 0,
                politeness_jitter_ms: 0,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
            },
        }
    }

    fn raw(title: &str, url: &str, rating: &str) -> RawRecord {
        RawRecord {
            title: title.to_string(),
            price_text: "12.50".to_string(),
            rating: Some(RawRating::Word(rating.to_string())),
            availability_text: Some("In stock (4 available)".to_string()),
            category_text: Some("Travel".to_string()),
            product_url: url.to_string(),
        }
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Crawl.to_string(), "CRAWL");
        assert_eq!(Stage::InsertRaw.to_string(), "INSERT_RAW");
        assert_eq!(Stage::Normalize.to_string(), "NORMALIZE");
        assert_eq!(Stage::Upsert.to_string(), "UPSERT");
    }

    #[test]
    fn test_normalize_all_counts_drops() {
        let rows = vec![
            RawRow::from(raw("Kept", "https://x.test/kept", "Two")),
            RawRow::from(raw("", "https://x.test/untitled", "Two")),
            RawRow::from(raw("No URL", "", "Two")),
        ];
        let mut summary = RunSummary::default();

        let normalized = normalize_all(&rows, &mut summary);
        assert_eq!(normalized.len(), 1);
        assert_eq!(summary.normalized, 1);
        assert_eq!(summary.dropped, 2);
    }

    #[test]
    fn test_renormalize_reads_stored_rows() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .insert_raw(&[
                raw("Sapiens", "https://x.test/sapiens", "Five"),
                raw("", "https://x.test/blank", "One"),
            ])
            .unwrap();

        let config = create_test_config("https://books.toscrape.com/");
        let mut pipeline = Pipeline::new(config, storage, "test_hash");
        let summary = pipeline.renormalize().unwrap();

        assert_eq!(summary.crawled, 0);
        assert_eq!(summary.normalized, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.inserted, 1);

        let product = pipeline
            .storage()
            .get_product("https://x.test/sapiens")
            .unwrap()
            .unwrap();
        assert_eq!(product.rating, Some(5));
        assert_eq!(product.price, Some(12.5));
        assert_eq!(product.availability, Some(4));
        assert_eq!(product.category.as_deref(), Some("Travel"));
    }

    #[tokio::test]
    async fn test_listing_failure_marks_run_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = create_test_config(&format!("{}/", server.uri()));
        let storage = SqliteStorage::new_in_memory().unwrap();
        let mut pipeline = Pipeline::new(config, storage, "test_hash");

        let result = pipeline.run().await;
        assert!(matches!(
            result,
            Err(EtlError::Fetch(FetchError::Status { status: 500, .. }))
        ));

        let storage = pipeline.into_storage();
        assert_eq!(storage.count_raw().unwrap(), 0);
        assert_eq!(storage.count_products().unwrap(), 0);
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error_message.unwrap().contains("500"));
    }
}
