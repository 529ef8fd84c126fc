//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::pipeline::RunSummary;
use crate::record::{NormalizedRecord, RawRating, RawRecord, StoredRawRow};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ProductRecord, RunRecord, RunStatus, UpsertReport};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, crawled,
     raw_inserted, normalized, dropped, upserted, error_message";

const PRODUCT_COLUMNS: &str = "id, title, price, rating, availability, category, product_url,
     first_seen_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path` and its parent directory
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        crawled: row.get(5)?,
        raw_inserted: row.get(6)?,
        normalized: row.get(7)?,
        dropped: row.get(8)?,
        upserted: row.get(9)?,
        error_message: row.get(10)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
    Ok(ProductRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        rating: row.get(3)?,
        availability: row.get(4)?,
        category: row.get(5)?,
        product_url: row.get(6)?,
        first_seen_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Raw Audit =====

    fn insert_raw(&mut self, records: &[RawRecord]) -> StorageResult<usize> {
        let scraped_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_products
                    (title, price_raw, rating_raw, availability_raw, category_raw,
                     product_page_url, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.title,
                    record.price_text,
                    record.rating.as_ref().map(|r| r.as_text().into_owned()),
                    record.availability_text,
                    record.category_text,
                    record.product_url,
                    scraped_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn load_raw_rows(&self) -> StorageResult<Vec<StoredRawRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, price_raw, rating_raw, availability_raw, category_raw,
             product_page_url, scraped_at
             FROM raw_products ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRawRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    price_raw: row.get(2)?,
                    rating_raw: row.get(3)?,
                    availability_raw: row.get(4)?,
                    category_raw: row.get(5)?,
                    product_page_url: row.get(6)?,
                    scraped_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count_raw(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM raw_products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Canonical Records =====

    fn upsert(&mut self, records: &[NormalizedRecord]) -> StorageResult<UpsertReport> {
        let now = Utc::now().to_rfc3339();
        let mut report = UpsertReport::default();

        let tx = self.conn.transaction()?;
        {
            let mut exists = tx.prepare("SELECT 1 FROM products WHERE product_url = ?1")?;
            let mut insert = tx.prepare(
                "INSERT INTO products
                    (title, price, rating, availability, category, product_url,
                     first_seen_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            )?;
            let mut update = tx.prepare(
                "UPDATE products SET title = ?1, price = ?2, rating = ?3, availability = ?4,
                 category = ?5, updated_at = ?7 WHERE product_url = ?6",
            )?;

            for record in records {
                let values = params![
                    record.title,
                    record.price,
                    record.rating,
                    record.availability,
                    record.category,
                    record.product_url,
                    now,
                ];

                if exists.exists(params![record.product_url])? {
                    update.execute(values)?;
                    report.updated += 1;
                } else {
                    insert.execute(values)?;
                    report.inserted += 1;
                }
            }
        }
        tx.commit()?;

        Ok(report)
    }

    fn record_exists(&self, product_url: &str) -> StorageResult<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM products WHERE product_url = ?1")?;
        Ok(stmt.exists(params![product_url])?)
    }

    fn get_product(&self, product_url: &str) -> StorageResult<Option<ProductRecord>> {
        let product = self
            .conn
            .query_row(
                &format!("SELECT {} FROM products WHERE product_url = ?1", PRODUCT_COLUMNS),
                params![product_url],
                product_from_row,
            )
            .optional()?;

        Ok(product)
    }

    fn count_products(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Ledger =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, crawled = ?3, raw_inserted = ?4,
             normalized = ?5, dropped = ?6, upserted = ?7 WHERE id = ?8",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                summary.crawled as i64,
                summary.raw_inserted as i64,
                summary.normalized as i64,
                summary.dropped as i64,
                summary.upserted() as i64,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error_message, run_id],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }
}
