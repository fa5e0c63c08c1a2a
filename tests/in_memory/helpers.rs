//! Shared wiring for in-memory integration tests.

use std::sync::Arc;

use board_archival::archival::{
    adapters::memory::{InMemoryArchivalStore, InMemoryBlobStore, InMemoryJobStatusRepository},
    services::{ArchivalDispatcher, ArchiveService, RestoreService},
};
use rstest::fixture;

pub use crate::test_helpers::board::{
    FixedClock, SeededBoard, committed_aggregate, fixture_time, seed_sprint_board,
};

/// Dispatcher over the in-memory adapters.
pub type MemoryDispatcher = ArchivalDispatcher<
    InMemoryArchivalStore,
    InMemoryBlobStore,
    InMemoryJobStatusRepository,
    FixedClock,
>;

/// Adapters and engines sharing one in-memory store.
pub struct MemoryStack {
    /// Relational store.
    pub store: Arc<InMemoryArchivalStore>,
    /// Blob store.
    pub blobs: Arc<InMemoryBlobStore>,
    /// Job records.
    pub jobs: Arc<InMemoryJobStatusRepository>,
    /// Archive engine.
    pub archive: ArchiveService<InMemoryArchivalStore, InMemoryBlobStore, FixedClock>,
    /// Restore engine.
    pub restore: RestoreService<InMemoryArchivalStore, InMemoryBlobStore>,
}

impl MemoryStack {
    /// Builds a dispatcher over this stack's engines and job records.
    #[must_use]
    pub fn dispatcher(&self, clock: FixedClock) -> MemoryDispatcher {
        ArchivalDispatcher::new(
            self.archive.clone(),
            self.restore.clone(),
            Arc::clone(&self.jobs),
            Arc::new(clock),
        )
    }
}

/// Provides an empty in-memory stack whose clock reads noon.
///
/// # Errors
///
/// Returns an error if the fixture time is invalid.
#[fixture]
pub fn stack() -> eyre::Result<MemoryStack> {
    let clock = Arc::new(FixedClock::noon()?);
    let store = Arc::new(InMemoryArchivalStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    Ok(MemoryStack {
        archive: ArchiveService::new(Arc::clone(&store), Arc::clone(&blobs), clock),
        restore: RestoreService::new(Arc::clone(&store), Arc::clone(&blobs)),
        jobs: Arc::new(InMemoryJobStatusRepository::new()),
        store,
        blobs,
    })
}
