//! Board archival: moving a board aggregate between the relational store
//! and blob storage.
//!
//! Archiving snapshots a board with its states, tasks, comments and members
//! into one JSON blob, then marks the board archived and deletes its
//! children in a single commit. Dearchiving rebuilds the aggregate from the
//! latest blob, translating store-assigned state keys, and deletes the blob
//! once the rebuild has committed. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
