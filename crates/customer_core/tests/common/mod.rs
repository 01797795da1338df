#![allow(dead_code)]

//! Database fixtures standing in for external migration tooling.

use customer_core::{OpContext, SqliteCustomerRepository};
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

pub const INIT_DB_SQL: &str = include_str!("../testdata/init-db.sql");

/// Throwaway database file, removed when dropped.
pub struct TestDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    /// Database with the customer schema and the `John` seed row.
    pub fn seeded() -> Self {
        Self::with_schema(INIT_DB_SQL)
    }

    /// Database file with no tables at all.
    pub fn empty() -> Self {
        Self::with_schema("PRAGMA user_version = 1;")
    }

    pub fn with_schema(sql: &str) -> Self {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("test-db.sqlite3");
        let conn = Connection::open(&path).expect("fixture database should open");
        conn.execute_batch(sql).expect("fixture schema should apply");
        conn.close().expect("fixture connection should close");
        Self { _dir: dir, path }
    }

    pub fn connection_string(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    pub fn open_repo(&self) -> SqliteCustomerRepository {
        SqliteCustomerRepository::open(&OpContext::background(), &self.connection_string())
            .expect("fixture repository should open")
    }

    /// Side connection for assertions and lock contention.
    pub fn raw_connection(&self) -> Connection {
        Connection::open(&self.path).expect("side connection should open")
    }

    pub fn count_customers(&self) -> i64 {
        self.raw_connection()
            .query_row("SELECT COUNT(*) FROM customers;", [], |row| row.get(0))
            .expect("customer count should be readable")
    }
}
