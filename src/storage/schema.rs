//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Catalog-ETL database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track pipeline runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    crawled INTEGER,
    raw_inserted INTEGER,
    normalized INTEGER,
    dropped INTEGER,
    upserted INTEGER,
    error_message TEXT
);

-- Append-only audit copy of every scraped record
CREATE TABLE IF NOT EXISTS raw_products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    price_raw TEXT,
    rating_raw TEXT,
    availability_raw TEXT,
    category_raw TEXT,
    product_page_url TEXT,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_raw_products_url ON raw_products(product_page_url);

-- Canonical records, one per product URL
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    price REAL,
    rating INTEGER CHECK (rating BETWEEN 0 AND 5),
    availability INTEGER,
    category TEXT,
    product_url TEXT NOT NULL UNIQUE,
    first_seen_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Creates every table and index that does not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "raw_products", "products"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_product_url_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let insert = "INSERT INTO products (title, product_url, first_seen_at, updated_at)
                      VALUES ('t', 'https://books.toscrape.com/a', 'now', 'now')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
