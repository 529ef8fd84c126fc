//! Paginated catalog crawl
//!
//! A [`Crawler`] owns the network session. Each call to [`Crawler::crawl`] starts a
//! fresh, single-pass [`CatalogCrawl`] that pulls records one at a time: listing pages
//! are fetched only when the cards of the previous page have all been emitted, and
//! every card costs one detail-page fetch.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use url::Url;

use crate::config::{Config, FetchConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{parse_detail_page, parse_listing_page, DetailPage, PartialCard};
use crate::record::{RawRating, RawRecord};
use crate::EtlError;

/// Pause inserted between listing-page fetches
#[derive(Debug, Clone, Copy)]
pub struct Politeness {
    pub delay: Duration,
    /// Upper bound (exclusive) of the random extra wait
    pub jitter: Duration,
}

impl Politeness {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.politeness_delay_ms),
            jitter: Duration::from_millis(config.politeness_jitter_ms),
        }
    }

    /// Fixed delay plus a random fraction of the jitter
    pub fn next_pause(&self) -> Duration {
        let fraction: f64 = rand::rng().random();
        self.delay + self.jitter.mul_f64(fraction)
    }
}

/// Drives paginated crawls of one catalog site
pub struct Crawler {
    fetcher: Fetcher,
    base_url: Url,
    politeness: Politeness,
}

impl Crawler {
    pub fn new(fetcher: Fetcher, base_url: Url, politeness: Politeness) -> Self {
        Self {
            fetcher,
            base_url,
            politeness,
        }
    }

    /// Builds a crawler and its session from configuration
    pub fn from_config(config: &Config) -> Result<Self, EtlError> {
        let fetcher = Fetcher::new(&config.fetch, &config.user_agent)?;
        let base_url = Url::parse(&config.site.base_url)?;
        Ok(Self::new(
            fetcher,
            base_url,
            Politeness::from_config(&config.fetch),
        ))
    }

    /// Starts a crawl at `start_path` (relative to the base URL) covering at most
    /// `max_pages` listing pages
    ///
    /// The crawl borrows the session exclusively until it is dropped.
    pub fn crawl(&mut self, start_path: &str, max_pages: u32) -> Result<CatalogCrawl<'_>, EtlError> {
        let start = self.base_url.join(start_path.trim_start_matches('/'))?;
        Ok(CatalogCrawl {
            fetcher: &self.fetcher,
            politeness: self.politeness,
            next_page: (max_pages > 0).then_some(start),
            pages_fetched: 0,
            max_pages,
            pending: VecDeque::new(),
        })
    }
}

/// A single traversal of the catalog; finite and not restartable
pub struct CatalogCrawl<'a> {
    fetcher: &'a Fetcher,
    politeness: Politeness,
    next_page: Option<Url>,
    pages_fetched: u32,
    max_pages: u32,
    pending: VecDeque<PartialCard>,
}

impl CatalogCrawl<'_> {
    /// Number of listing pages fetched so far
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Produces the next record, or `None` once pagination or the page budget ends
    ///
    /// A listing page that cannot be fetched aborts the crawl with an error. A detail
    /// page that cannot be fetched only blanks that record's category and availability.
    pub async fn next_record(&mut self) -> Result<Option<RawRecord>, EtlError> {
        loop {
            if let Some(card) = self.pending.pop_front() {
                let detail = self.fetch_detail(&card).await;
                return Ok(Some(merge(card, detail)));
            }

            let Some(page_url) = self.next_page.take() else {
                return Ok(None);
            };
            self.load_listing(page_url).await?;
        }
    }

    /// Drains the crawl into a vector
    pub async fn collect_records(mut self) -> Result<Vec<RawRecord>, EtlError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    async fn load_listing(&mut self, page_url: Url) -> Result<(), EtlError> {
        if self.pages_fetched > 0 {
            let pause = self.politeness.next_pause();
            tracing::debug!("Waiting {:?} before {}", pause, page_url);
            tokio::time::sleep(pause).await;
        }

        let html = self.fetcher.fetch(page_url.as_str()).await?;
        self.pages_fetched += 1;

        let page = parse_listing_page(&html, &page_url);
        tracing::info!(
            "Listing page {} ({}/{}): {} cards",
            page_url,
            self.pages_fetched,
            self.max_pages,
            page.cards.len()
        );

        self.pending.extend(page.cards);
        self.next_page = page
            .next_page
            .filter(|_| self.pages_fetched < self.max_pages);
        Ok(())
    }

    async fn fetch_detail(&self, card: &PartialCard) -> DetailPage {
        if card.product_url.is_empty() {
            return DetailPage::default();
        }

        match self.fetcher.fetch(&card.product_url).await {
            Ok(html) => parse_detail_page(&html),
            Err(e) => {
                tracing::warn!("Skipping detail enrichment for {}: {}", card.product_url, e);
                DetailPage::default()
            }
        }
    }
}

fn merge(card: PartialCard, detail: DetailPage) -> RawRecord {
    RawRecord {
        title: card.title,
        price_text: card.price_text,
        rating: card.rating.map(RawRating::Stars),
        availability_text: detail.availability_text,
        category_text: detail.category,
        product_url: card.product_url,
    }
}
