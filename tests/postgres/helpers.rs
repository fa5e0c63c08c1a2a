//! Shared test helpers for `PostgreSQL` integration tests.

use board_archival::archival::adapters::postgres::{
    ArchivalPgPool, PostgresArchivalStore, PostgresJobStatusRepository, build_pool,
};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use uuid::Uuid;

pub use crate::test_helpers::board::{
    FixedClock, SeededBoard, committed_aggregate, fixture_time, seed_sprint_board,
};

/// Environment variable naming the test server.
pub const TEST_DATABASE_URL_ENV: &str = "ARCHIVAL_TEST_DATABASE_URL";

/// SQL creating boards and their children.
pub const CREATE_BOARD_TABLES_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_board_tables/up.sql");

/// SQL creating the job-status table.
pub const CREATE_ARCHIVAL_JOBS_SQL: &str =
    include_str!("../../migrations/2026-10-01-000001_create_archival_jobs/up.sql");

/// A migrated schema that is dropped when the value goes out of scope.
pub struct TestSchema {
    admin_url: String,
    name: String,
    /// Pool whose connections resolve tables in this schema.
    pub pool: ArchivalPgPool,
}

impl TestSchema {
    /// Returns a relational store over the schema.
    #[must_use]
    pub fn store(&self) -> PostgresArchivalStore {
        PostgresArchivalStore::new(self.pool.clone())
    }

    /// Returns a job-status repository over the schema.
    #[must_use]
    pub fn jobs(&self) -> PostgresJobStatusRepository {
        PostgresJobStatusRepository::new(self.pool.clone())
    }
}

impl Drop for TestSchema {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.admin_url) {
            let statement = format!("DROP SCHEMA IF EXISTS {} CASCADE", self.name);
            let _dropped = conn.batch_execute(&statement);
        }
    }
}

/// Creates and migrates a private schema, or returns `None` when no test
/// server is configured.
///
/// # Errors
///
/// Returns an error if the server rejects the connection or a migration.
pub fn provision_schema() -> eyre::Result<Option<TestSchema>> {
    let Some(admin_url) = std::env::var(TEST_DATABASE_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
    else {
        return Ok(None);
    };
    let name = format!("archival_test_{}", Uuid::new_v4().simple());

    let mut conn = PgConnection::establish(&admin_url)?;
    conn.batch_execute(&format!("CREATE SCHEMA {name}; SET search_path TO {name};"))?;
    conn.batch_execute(CREATE_BOARD_TABLES_SQL)?;
    conn.batch_execute(CREATE_ARCHIVAL_JOBS_SQL)?;

    let pool = build_pool(&with_search_path(&admin_url, &name), 4)?;
    Ok(Some(TestSchema {
        admin_url,
        name,
        pool,
    }))
}

/// Appends a libpq `options` parameter pinning `search_path` to `schema`.
fn with_search_path(url: &str, schema: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-csearch_path%3D{schema}")
}
