//! Normalization of scraped text into typed values
//!
//! Pure functions only: no I/O and no state. Unparseable fields become `None`;
//! only a missing title or product URL drops a whole row.

mod fields;
mod row;

pub use fields::{normalize_availability, normalize_price, normalize_rating};
pub use row::{normalize_row, try_normalize_row, RowRejection};
