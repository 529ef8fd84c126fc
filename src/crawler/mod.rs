//! Crawler module for catalog page fetching and extraction
//!
//! This module contains the extract side of the pipeline:
//! - HTTP fetching with retry and backoff
//! - Listing and detail page parsing
//! - Paginated crawl with politeness delays

mod crawl;
mod fetcher;
mod parser;

pub use crawl::{CatalogCrawl, Crawler, Politeness};
pub use fetcher::{backoff_delay, build_http_client, Fetcher};
pub use parser::{
    parse_detail_page, parse_listing_page, DetailPage, ListingPage, ParseAnomaly, PartialCard,
};
