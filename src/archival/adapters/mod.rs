//! Adapter implementations of the archival ports.
//!
//! - [`memory`]: in-memory store, blob store and job records for tests
//! - [`postgres`]: Diesel-backed relational store and job records
//! - [`filesystem`]: blob store rooted in a local directory

pub mod filesystem;
pub mod memory;
pub mod postgres;
