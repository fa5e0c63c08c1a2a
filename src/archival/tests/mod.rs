//! Unit tests for the archival module.
//!
//! Domain tests cover naming, remapping and job records; service tests run
//! the engines against the in-memory adapters.

mod support;
