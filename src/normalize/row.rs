//! Row-level normalization

use thiserror::Error;

use crate::normalize::fields::{normalize_availability, normalize_price, normalize_rating};
use crate::record::{NormalizedRecord, RawRow};

/// Why a row was dropped instead of normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("title is missing or blank")]
    MissingTitle,

    #[error("product URL is missing or blank")]
    MissingUrl,
}

/// Normalizes a row, or explains why it cannot be
///
/// Only a blank title or URL rejects the row; every other field degrades to `None`
/// when it cannot be interpreted.
pub fn try_normalize_row(row: &RawRow) -> Result<NormalizedRecord, RowRejection> {
    let fields = row.fields();

    let title = fields.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(RowRejection::MissingTitle);
    }

    let product_url = fields
        .product_url
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if product_url.is_empty() {
        return Err(RowRejection::MissingUrl);
    }

    let category = fields
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(NormalizedRecord {
        title: title.to_string(),
        price: normalize_price(fields.price.as_deref()),
        rating: normalize_rating(fields.rating.as_deref()),
        availability: normalize_availability(fields.availability.as_deref()),
        category,
        product_url: product_url.to_string(),
    })
}

/// Normalizes a row, returning `None` when it has to be dropped
pub fn normalize_row(row: &RawRow) -> Option<NormalizedRecord> {
    match try_normalize_row(row) {
        Ok(record) => Some(record),
        Err(reason) => {
            tracing::debug!("Dropping row: {}", reason);
            None
        }
    }
}
