//! Service-level errors and their classification.

use crate::archival::{
    domain::BoardId,
    ports::{BlobStoreError, StoreError},
};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchivalErrorKind {
    /// The board does not exist.
    NotFound,
    /// No snapshot exists for the board.
    NoSnapshot,
    /// The snapshot cannot be used.
    Malformed,
    /// The relational store or blob store failed.
    StoreFailure,
    /// The inbound message could not be understood.
    InvalidMessage,
    /// The run did not finish before its deadline.
    DeadlineExceeded,
}

/// Pipeline step in which an engine run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchivalPhase {
    /// Opening the unit of work and loading the aggregate.
    Load,
    /// Serializing the snapshot.
    Encode,
    /// Writing the snapshot blob.
    Upload,
    /// Committing the unit of work.
    Commit,
    /// Finding the latest snapshot blob.
    Locate,
    /// Reading the snapshot blob.
    Download,
    /// Parsing the snapshot blob.
    Decode,
    /// Inserting or overwriting the board row.
    UpsertBoard,
    /// Recreating states and building the key map.
    RemapStates,
    /// Recreating tasks, comments and members.
    RecreateChildren,
}

impl ArchivalPhase {
    /// Returns the phase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Encode => "encode",
            Self::Upload => "upload",
            Self::Commit => "commit",
            Self::Locate => "locate",
            Self::Download => "download",
            Self::Decode => "decode",
            Self::UpsertBoard => "upsert_board",
            Self::RemapStates => "remap_states",
            Self::RecreateChildren => "recreate_children",
        }
    }
}

impl fmt::Display for ArchivalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the archive, restore and dispatch services.
#[derive(Debug, Clone, Error)]
pub enum ArchivalError {
    /// The board does not exist at load time.
    #[error("board {0} not found")]
    NotFound(BoardId),

    /// No snapshot blob exists for the board.
    #[error("no snapshot found for board {0}")]
    NoSnapshot(BoardId),

    /// The snapshot cannot be encoded, decoded or applied.
    #[error("malformed snapshot {location}: {reason}")]
    Malformed {
        /// Blob name of the offending snapshot.
        location: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Relational store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Blob store failure.
    #[error(transparent)]
    Blob(#[from] BlobStoreError),

    /// The inbound message could not be parsed.
    #[error("invalid archival message: {0}")]
    InvalidMessage(String),

    /// The run was abandoned before commit when its deadline expired.
    #[error("archival of board {board_id} exceeded its {limit:?} deadline")]
    DeadlineExceeded {
        /// Board the run targeted.
        board_id: BoardId,
        /// Configured deadline.
        limit: Duration,
    },
}

impl ArchivalError {
    /// Builds a [`ArchivalError::Malformed`] error.
    pub fn malformed(location: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ArchivalErrorKind {
        match self {
            Self::NotFound(_) => ArchivalErrorKind::NotFound,
            Self::NoSnapshot(_) => ArchivalErrorKind::NoSnapshot,
            Self::Malformed { .. } => ArchivalErrorKind::Malformed,
            Self::Store(_) | Self::Blob(_) => ArchivalErrorKind::StoreFailure,
            Self::InvalidMessage(_) => ArchivalErrorKind::InvalidMessage,
            Self::DeadlineExceeded { .. } => ArchivalErrorKind::DeadlineExceeded,
        }
    }
}

/// Result type for archival services.
pub type ArchivalResult<T> = Result<T, ArchivalError>;

/// Logs a failed step once, with the board and phase, and hands the error
/// back unchanged.
pub(crate) fn log_failure(
    operation: &'static str,
    board_id: BoardId,
    phase: ArchivalPhase,
    err: ArchivalError,
) -> ArchivalError {
    tracing::error!(
        %board_id,
        %phase,
        operation,
        error = %err,
        "board {operation} failed"
    );
    err
}
