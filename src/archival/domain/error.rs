//! Error types for archival domain parsing.

use thiserror::Error;

/// Errors returned while constructing archival domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArchivalDomainError {
    /// The blob name does not follow the snapshot naming scheme.
    #[error("invalid snapshot location: {0}")]
    InvalidSnapshotLocation(String),

    /// The requested job kind is not supported.
    #[error("unknown job kind: {0}")]
    UnknownJobKind(String),
}

/// Error returned while parsing job statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);
