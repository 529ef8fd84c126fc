//! Converters from loosely formatted text to typed field values
//!
//! Every converter is total: text it cannot interpret becomes `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;

/// First run of digits, optionally followed by a decimal part
static DECIMAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("decimal pattern is valid"));

/// First run of digits
static INTEGER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("integer pattern is valid"));

/// Currency markers stripped before a direct parse. `Â` is what a UTF-8 `£` turns into
/// when the page is decoded as Latin-1.
const CURRENCY_MARKERS: [&str; 4] = ["Â", "£", "$", "€"];

const RATING_WORDS: [(&str, u8); 6] = [
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
];

const MAX_RATING: f64 = 5.0;

/// Parses a price such as `"£51.77"` or `"  £99.99  "` into `51.77` / `99.99`
pub fn normalize_price(text: Option<&str>) -> Option<f64> {
    let text = text?;
    if text.trim().is_empty() {
        return None;
    }

    if let Some(run) = DECIMAL_RUN.captures(text).and_then(|c| c.get(1)) {
        return run.as_str().parse::<f64>().ok();
    }

    let stripped = CURRENCY_MARKERS
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker, ""));
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return None;
    }

    match stripped.parse::<f64>() {
        Ok(price) if price.is_finite() => Some(price),
        _ => {
            tracing::warn!("Could not parse price: {:?}", text);
            None
        }
    }
}

/// Parses a rating given as a word (`"Five"`) or a number (`"4.0"`) into `0..=5`
pub fn normalize_rating(text: Option<&str>) -> Option<u8> {
    let text = text?;
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    if let Some((_, value)) = RATING_WORDS.iter().find(|(word, _)| *word == lowered) {
        return Some(*value);
    }

    let rating = DECIMAL_RUN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|run| run.as_str().parse::<f64>().ok())
        .filter(|value| (0.0..=MAX_RATING).contains(value))
        .map(|value| value.round_ties_even() as u8);

    if rating.is_none() {
        tracing::warn!("Could not parse rating: {:?}", text);
    }
    rating
}

/// Parses free-text stock descriptions into a unit count
///
/// `"In stock (22 available)"` → `22`, `"In stock"` → `1`, `"Out of Stock"` → `None`.
pub fn normalize_availability(text: Option<&str>) -> Option<u32> {
    let text = text?;
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    if lowered.contains("out of stock") || lowered.contains("unavailable") {
        return None;
    }

    if let Some(run) = INTEGER_RUN.captures(&lowered).and_then(|c| c.get(1)) {
        return match run.as_str().parse::<u32>() {
            Ok(count) => Some(count),
            Err(_) => {
                tracing::warn!("Could not parse availability count: {:?}", text);
                None
            }
        };
    }

    // In stock without a count still means at least one unit
    if lowered.contains("in stock") || lowered.contains("available") {
        return Some(1);
    }

    tracing::warn!("Could not parse availability: {:?}", text);
    None
}
