//! HTML parser for catalog listing and product detail pages
//!
//! Listing pages yield product cards plus the link to the next page. Detail pages
//! yield the enrichment fields a card does not carry. Missing markup never fails a
//! parse; it is reported as a [`ParseAnomaly`] and the field is left empty.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Star-rating class words and their values
const RATING_WORDS: [(&str, u8); 5] = [("one", 1), ("two", 2), ("three", 3), ("four", 4), ("five", 5)];

/// Characters stripped from the front of a price
const CURRENCY_PREFIX: [char; 4] = ['Â', '£', '$', '€'];

/// Breadcrumb position of the category: home, section, category, title
const CATEGORY_CRUMB: usize = 2;

/// Expected page structure that was not found
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAnomaly {
    #[error("card has no title link")]
    MissingTitle,

    #[error("card has no price element")]
    MissingPrice,

    #[error("card has no star-rating marker")]
    MissingRating,

    #[error("card has no product link")]
    MissingProductLink,

    #[error("breadcrumb has {depth} entries, category needs at least 3")]
    ShallowBreadcrumb { depth: usize },

    #[error("detail page has no availability text")]
    MissingAvailability,
}

/// A product card as it appears on a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct PartialCard {
    /// Trimmed title, empty if the card had none
    pub title: String,
    /// Price text without its currency symbol
    pub price_text: String,
    /// Rating mapped from the star-rating class word
    pub rating: Option<u8>,
    /// Absolute URL of the detail page, empty if the card had no link
    pub product_url: String,
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub cards: Vec<PartialCard>,
    /// Absolute URL of the following page; `None` ends pagination
    pub next_page: Option<Url>,
}

/// Enrichment fields from a product detail page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    pub category: Option<String>,
    /// Stock text passed through as found
    pub availability_text: Option<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn note(anomaly: ParseAnomaly, context: &str) {
    tracing::debug!("Parse anomaly on {}: {}", context, anomaly);
}

/// Parses a listing page
///
/// Relative links are resolved against `page_url`, the URL the page was fetched from.
///
/// # Example
///
/// ```
/// use catalog_etl::crawler::parse_listing_page;
/// use url::Url;
///
/// let html = r#"<article class="product_pod">
///     <p class="star-rating Two"></p>
///     <h3><a href="book_1/index.html" title="A Book">A Book</a></h3>
///     <p class="price_color">£10.00</p>
/// </article>"#;
/// let page_url = Url::parse("https://books.toscrape.com/catalogue/page-1.html").unwrap();
/// let page = parse_listing_page(html, &page_url);
/// assert_eq!(page.cards[0].rating, Some(2));
/// assert_eq!(page.cards[0].product_url, "https://books.toscrape.com/catalogue/book_1/index.html");
/// ```
pub fn parse_listing_page(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let card_selector = selector("article.product_pod");

    let cards = document
        .select(&card_selector)
        .map(|card| parse_card(card, page_url))
        .collect();

    let next_page = document
        .select(&selector("li.next a[href]"))
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_link(href, page_url));

    ListingPage { cards, next_page }
}

fn parse_card(card: ElementRef<'_>, page_url: &Url) -> PartialCard {
    let context = page_url.as_str();
    let link = card.select(&selector("h3 a")).next();

    let title = link
        .map(|a| match a.value().attr("title") {
            Some(title) => title.trim().to_string(),
            None => text_of(a),
        })
        .unwrap_or_default();
    if title.is_empty() {
        note(ParseAnomaly::MissingTitle, context);
    }

    let product_url = link
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_link(href, page_url))
        .map(String::from)
        .unwrap_or_default();
    if product_url.is_empty() {
        note(ParseAnomaly::MissingProductLink, context);
    }

    let price_text = match card.select(&selector(".price_color")).next() {
        Some(price) => strip_currency(&text_of(price)),
        None => {
            note(ParseAnomaly::MissingPrice, context);
            String::new()
        }
    };

    let rating = card
        .select(&selector("p.star-rating"))
        .next()
        .and_then(|marker| {
            marker
                .value()
                .classes()
                .filter(|class| *class != "star-rating")
                .find_map(rating_for_word)
        });
    if rating.is_none() {
        note(ParseAnomaly::MissingRating, context);
    }

    PartialCard {
        title,
        price_text,
        rating,
        product_url,
    }
}

fn strip_currency(price: &str) -> String {
    price.trim_start_matches(CURRENCY_PREFIX).trim().to_string()
}

fn rating_for_word(word: &str) -> Option<u8> {
    RATING_WORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|(_, value)| *value)
}

/// Resolves an href against the page it appeared on; only http(s) results are kept
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

/// Parses a product detail page
pub fn parse_detail_page(html: &str) -> DetailPage {
    let document = Html::parse_document(html);

    let crumbs: Vec<String> = document
        .select(&selector("ul.breadcrumb li"))
        .map(text_of)
        .collect();
    let category = crumbs
        .get(CATEGORY_CRUMB)
        .filter(|crumb| !crumb.is_empty())
        .cloned();
    if category.is_none() {
        note(
            ParseAnomaly::ShallowBreadcrumb {
                depth: crumbs.len(),
            },
            "detail page",
        );
    }

    let availability_text = document
        .select(&selector("p.availability"))
        .next()
        .map(text_of)
        .filter(|text| !text.is_empty())
        .or_else(|| availability_from_table(&document));
    if availability_text.is_none() {
        note(ParseAnomaly::MissingAvailability, "detail page");
    }

    DetailPage {
        category,
        availability_text,
    }
}

/// Falls back to the product information table's "Availability" row
fn availability_from_table(document: &Html) -> Option<String> {
    let th = selector("th");
    let td = selector("td");

    document.select(&selector("table tr")).find_map(|row| {
        let heading = row.select(&th).next().map(text_of)?;
        if !heading.eq_ignore_ascii_case("availability") {
            return None;
        }
        row.select(&td)
            .next()
            .map(text_of)
            .filter(|text| !text.is_empty())
    })
}
