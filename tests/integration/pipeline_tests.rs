//! End-to-end pipeline runs against a mock catalog

use catalog_etl::config::{Config, FetchConfig, OutputConfig, SiteConfig, UserAgentConfig};
use catalog_etl::storage::{RunStatus, SqliteStorage, Storage};
use catalog_etl::{EtlError, FetchError, Pipeline};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RATING_WORDS: [&str; 5] = ["One", "Two", "Three", "Four", "Five"];

/// Creates a test configuration pointed at the mock server with no delays
fn create_test_config(base_url: &str, db_path: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: format!("{}/", base_url),
            start_path: "catalogue/page-1.html".to_string(),
            max_pages: 5,
        },
        fetch: FetchConfig {
            timeout_secs: 5,
            max_attempts: 2,
            backoff_unit_ms: 1,
            politeness_delay_ms: 0,
            politeness_jitter_ms: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
        },
    }
}

fn book_title(index: usize, edition: &str) -> String {
    format!("Book {} ({})", index, edition)
}

/// Builds a listing page with `count` cards; `renamed` gets a different title
fn listing_page(count: usize, renamed: Option<usize>, next: Option<&str>) -> String {
    let mut html = String::from("<html><body><section><ol class=\"row\">");
    for i in 0..count {
        let title = if renamed == Some(i) {
            book_title(i, "revised")
        } else {
            book_title(i, "first")
        };
        html.push_str(&format!(
            r#"<li><article class="product_pod">
                <p class="star-rating {rating}"><i class="icon-star"></i></p>
                <h3><a href="book_{i}/index.html" title="{title}">{title}</a></h3>
                <div class="product_price"><p class="price_color">£{price}.99</p></div>
            </article></li>"#,
            rating = RATING_WORDS[i % 5],
            price = 10 + i,
        ));
    }
    html.push_str("</ol>");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#,
            next
        ));
    }
    html.push_str("</section></body></html>");
    html
}

fn detail_page(index: usize) -> String {
    format!(
        r#"<html><body>
        <ul class="breadcrumb">
            <li><a href="../../index.html">Home</a></li>
            <li><a href="../category/books_1/index.html">Books</a></li>
            <li><a href="../category/books/poetry_23/index.html">Poetry</a></li>
            <li class="active">Book {index}</li>
        </ul>
        <p class="instock availability"><i class="icon-ok"></i> In stock ({stock} available)</p>
        </body></html>"#,
        stock = index + 1,
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_catalog(server: &MockServer, count: usize, renamed: Option<usize>) {
    mount_html(
        server,
        "/catalogue/page-1.html",
        listing_page(count, renamed, None),
    )
    .await;
    for i in 0..count {
        mount_html(
            server,
            &format!("/catalogue/book_{}/index.html", i),
            detail_page(i),
        )
        .await;
    }
}

fn product_url(server: &MockServer, index: usize) -> String {
    format!("{}/catalogue/book_{}/index.html", server.uri(), index)
}

#[tokio::test]
async fn test_full_run_single_page() {
    let server = MockServer::start().await;
    mount_catalog(&server, 20, None).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let config = create_test_config(&server.uri(), &db_path);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(config, storage, "test_hash");
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.crawled, 20);
    assert_eq!(summary.raw_inserted, 20);
    assert_eq!(summary.normalized, 20);
    assert_eq!(summary.dropped, 0);
    assert_eq!(summary.upserted(), 20);
    assert_eq!(summary.inserted, 20);
    assert_eq!(summary.updated, 0);

    let storage = pipeline.into_storage();
    assert_eq!(storage.count_raw().unwrap(), 20);
    assert_eq!(storage.count_products().unwrap(), 20);

    let product = storage
        .get_product(&product_url(&server, 7))
        .unwrap()
        .expect("Product 7 should be stored");
    assert_eq!(product.title, book_title(7, "first"));
    assert_eq!(product.price, Some(17.99));
    assert_eq!(product.rating, Some(3));
    assert_eq!(product.availability, Some(8));
    assert_eq!(product.category.as_deref(), Some("Poetry"));

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test_hash");
    assert_eq!(run.crawled, Some(20));
    assert_eq!(run.upserted, Some(20));
}

#[tokio::test]
async fn test_second_run_updates_in_place() {
    let server = MockServer::start().await;
    mount_catalog(&server, 20, None).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");

    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(
        create_test_config(&server.uri(), &db_path),
        storage,
        "test_hash",
    );
    pipeline.run().await.unwrap();
    drop(pipeline);

    server.reset().await;
    mount_catalog(&server, 20, Some(4)).await;

    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(
        create_test_config(&server.uri(), &db_path),
        storage,
        "test_hash",
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.upserted(), 20);
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 20);

    let storage = pipeline.into_storage();
    assert_eq!(storage.count_products().unwrap(), 20);
    assert_eq!(storage.count_raw().unwrap(), 40);

    for i in 0..20 {
        let product = storage.get_product(&product_url(&server, i)).unwrap().unwrap();
        let expected = if i == 4 {
            book_title(i, "revised")
        } else {
            book_title(i, "first")
        };
        assert_eq!(product.title, expected);
    }
}

#[tokio::test]
async fn test_pagination_respects_page_budget() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/catalogue/page-1.html",
        listing_page(2, None, Some("page-2.html")),
    )
    .await;
    mount_html(
        &server,
        "/catalogue/page-2.html",
        listing_page(3, None, Some("page-3.html")),
    )
    .await;
    for i in 0..3 {
        mount_html(
            &server,
            &format!("/catalogue/book_{}/index.html", i),
            detail_page(i),
        )
        .await;
    }

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(
        create_test_config(&server.uri(), &db_path),
        storage,
        "test_hash",
    );

    // Page 3 is never mounted; a budget of two pages must stop before it
    let summary = pipeline.run_from("catalogue/page-1.html", 2).await.unwrap();

    assert_eq!(summary.crawled, 5);
    assert_eq!(summary.raw_inserted, 5);
    // Both pages reuse book_0 and book_1, so only three distinct URLs exist
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(pipeline.storage().count_products().unwrap(), 3);
}

#[tokio::test]
async fn test_unreachable_detail_page_keeps_record() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/catalogue/page-1.html",
        listing_page(2, None, None),
    )
    .await;
    mount_html(&server, "/catalogue/book_0/index.html", detail_page(0)).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/book_1/index.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(
        create_test_config(&server.uri(), &db_path),
        storage,
        "test_hash",
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.crawled, 2);
    assert_eq!(summary.inserted, 2);

    let product = pipeline
        .storage()
        .get_product(&product_url(&server, 1))
        .unwrap()
        .unwrap();
    assert_eq!(product.category, None);
    assert_eq!(product.availability, None);
    assert_eq!(product.rating, Some(2));
}

#[tokio::test]
async fn test_listing_failure_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(
        create_test_config(&server.uri(), &db_path),
        storage,
        "test_hash",
    );

    let result = pipeline.run().await;
    assert!(matches!(
        result,
        Err(EtlError::Fetch(FetchError::Status { status: 503, .. }))
    ));

    let storage = pipeline.into_storage();
    assert_eq!(storage.count_raw().unwrap(), 0);
    assert_eq!(storage.count_products().unwrap(), 0);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_renormalize_after_crawl() {
    let server = MockServer::start().await;
    mount_catalog(&server, 5, None).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut pipeline = Pipeline::new(
        create_test_config(&server.uri(), &db_path),
        storage,
        "test_hash",
    );
    let crawled = pipeline.run().await.unwrap();
    let before = pipeline
        .storage()
        .get_product(&product_url(&server, 2))
        .unwrap()
        .unwrap();

    let summary = pipeline.renormalize().unwrap();
    assert_eq!(summary.crawled, 0);
    assert_eq!(summary.raw_inserted, 0);
    assert_eq!(summary.normalized, crawled.normalized);
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 5);

    let after = pipeline
        .storage()
        .get_product(&product_url(&server, 2))
        .unwrap()
        .unwrap();
    assert_eq!(after.to_normalized(), before.to_normalized());
    assert_eq!(pipeline.storage().count_raw().unwrap(), 5);
}
