//! Helpers shared by the archival integration test crates.

pub mod env;
