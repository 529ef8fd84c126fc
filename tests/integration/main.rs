//! Integration tests for Catalog-ETL
//!
//! These tests use wiremock to serve a small catalog and drive the full
//! pipeline end-to-end against a SQLite database on disk.

mod pipeline_tests;
