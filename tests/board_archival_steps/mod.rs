//! Step definitions for board archival scenarios.

pub mod given;
pub mod then;
pub mod when;
