//! `PostgreSQL` adapters for board archival persistence.

mod jobs;
mod models;
mod schema;
mod store;

pub use jobs::PostgresJobStatusRepository;
pub use store::{ArchivalPgPool, PostgresArchivalStore, PostgresUnitOfWork, build_pool};
