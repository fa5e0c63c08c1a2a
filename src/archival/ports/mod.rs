//! Port contracts for board archival.
//!
//! Ports define infrastructure-agnostic interfaces used by the archival
//! services: the relational store, blob storage and job-status records.

pub mod blob;
pub mod jobs;
pub mod store;

pub use blob::{BlobStore, BlobStoreError, BlobStoreResult};
pub use jobs::{JobStatusError, JobStatusRepository, JobStatusResult};
pub use store::{
    ArchivalStore, Entity, EntityKind, Repository, StoreError, StoreResult, UnitOfWork,
    stage_inserts, stage_removals,
};
