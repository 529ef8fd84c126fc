//! Record shapes flowing through the pipeline
//!
//! A record starts life as a [`RawRecord`] emitted by the crawler, is copied verbatim
//! into the audit table (where it is read back as a [`StoredRawRow`]), and becomes a
//! [`NormalizedRecord`] once its text fields have been converted. [`RawRow`] unifies
//! every shape the normalizer accepts, and [`RawRow::fields`] is the one place where
//! shape-specific field names are mapped onto a canonical view.

use std::borrow::Cow;

/// A rating as scraped: either the marker word found on the page or a star count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRating {
    Word(String),
    Stars(u8),
}

impl RawRating {
    /// The rating in text form, which is what the normalizer matches against
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Word(word) => Cow::Borrowed(word.as_str()),
            Self::Stars(stars) => Cow::Owned(stars.to_string()),
        }
    }
}

/// A record exactly as the crawler produced it
///
/// Identity is `product_url`, which is not guaranteed unique within a crawl. Title
/// and URL may be empty when the page markup was malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub title: String,
    /// Price text with the currency symbol stripped
    pub price_text: String,
    pub rating: Option<RawRating>,
    pub availability_text: Option<String>,
    pub category_text: Option<String>,
    pub product_url: String,
}

/// A raw record as it was read back from the audit table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRawRow {
    pub id: i64,
    pub title: Option<String>,
    pub price_raw: Option<String>,
    pub rating_raw: Option<String>,
    pub availability_raw: Option<String>,
    pub category_raw: Option<String>,
    pub product_page_url: Option<String>,
    pub scraped_at: String,
}

/// A typed, validated record ready for canonical storage
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub title: String,
    pub price: Option<f64>,
    /// Star rating in `0..=5`
    pub rating: Option<u8>,
    /// Units in stock; `None` means unavailable or unknown
    pub availability: Option<u32>,
    pub category: Option<String>,
    pub product_url: String,
}

/// Any row the normalizer accepts
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Straight from the crawler
    Scraped(RawRecord),
    /// Read back from the raw audit table
    Stored(StoredRawRow),
    /// Already normalized; its typed values are rendered back to text
    Normalized(NormalizedRecord),
}

/// Canonical text view over a [`RawRow`], independent of its original field names
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowFields<'a> {
    pub title: Option<Cow<'a, str>>,
    pub price: Option<Cow<'a, str>>,
    pub rating: Option<Cow<'a, str>>,
    pub availability: Option<Cow<'a, str>>,
    pub category: Option<Cow<'a, str>>,
    pub product_url: Option<Cow<'a, str>>,
}

fn borrowed(value: &Option<String>) -> Option<Cow<'_, str>> {
    value.as_deref().map(Cow::Borrowed)
}

impl RawRow {
    /// Maps this row's fields onto the canonical view
    pub fn fields(&self) -> RowFields<'_> {
        match self {
            Self::Scraped(raw) => RowFields {
                title: Some(Cow::Borrowed(&raw.title)),
                price: Some(Cow::Borrowed(&raw.price_text)),
                rating: raw.rating.as_ref().map(RawRating::as_text),
                availability: borrowed(&raw.availability_text),
                category: borrowed(&raw.category_text),
                product_url: Some(Cow::Borrowed(&raw.product_url)),
            },
            Self::Stored(row) => RowFields {
                title: borrowed(&row.title),
                price: borrowed(&row.price_raw),
                rating: borrowed(&row.rating_raw),
                availability: borrowed(&row.availability_raw),
                category: borrowed(&row.category_raw),
                product_url: borrowed(&row.product_page_url),
            },
            Self::Normalized(record) => RowFields {
                title: Some(Cow::Borrowed(&record.title)),
                price: record.price.map(|p| Cow::Owned(p.to_string())),
                rating: record.rating.map(|r| Cow::Owned(r.to_string())),
                availability: record.availability.map(|a| Cow::Owned(a.to_string())),
                category: borrowed(&record.category),
                product_url: Some(Cow::Borrowed(&record.product_url)),
            },
        }
    }
}

impl From<RawRecord> for RawRow {
    fn from(raw: RawRecord) -> Self {
        Self::Scraped(raw)
    }
}

impl From<StoredRawRow> for RawRow {
    fn from(row: StoredRawRow) -> Self {
        Self::Stored(row)
    }
}

impl From<NormalizedRecord> for RawRow {
    fn from(record: NormalizedRecord) -> Self {
        Self::Normalized(record)
    }
}
