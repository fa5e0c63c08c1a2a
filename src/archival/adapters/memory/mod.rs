//! In-memory adapters for tests and local runs.

mod blob;
mod jobs;
mod store;

pub use blob::InMemoryBlobStore;
pub use jobs::InMemoryJobStatusRepository;
pub use store::{InMemoryArchivalStore, InMemorySession};
