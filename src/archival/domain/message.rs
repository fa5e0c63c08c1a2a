//! Inbound archival request messages.

use super::{ArchivalDomainError, BoardId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation requested by an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Move a live board into cold storage.
    #[serde(alias = "BoardArchival")]
    Archive,
    /// Rebuild a board from its latest snapshot.
    #[serde(alias = "BoardDearchival")]
    Dearchive,
}

impl JobKind {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Dearchive => "dearchive",
        }
    }
}

impl TryFrom<&str> for JobKind {
    type Error = ArchivalDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "archive" | "BoardArchival" => Ok(Self::Archive),
            "dearchive" | "BoardDearchival" => Ok(Self::Dearchive),
            other => Err(ArchivalDomainError::UnknownJobKind(other.to_owned())),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to archive or dearchive one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivalMessage {
    /// Board the request targets.
    pub board_id: BoardId,
    /// Optional display name, used for logging only.
    #[serde(default)]
    pub board_name: Option<String>,
    /// Requested operation.
    pub job_type: JobKind,
}

impl ArchivalMessage {
    /// Creates an archive request.
    #[must_use]
    pub const fn archive(board_id: BoardId) -> Self {
        Self {
            board_id,
            board_name: None,
            job_type: JobKind::Archive,
        }
    }

    /// Creates a dearchive request.
    #[must_use]
    pub const fn dearchive(board_id: BoardId) -> Self {
        Self {
            board_id,
            board_name: None,
            job_type: JobKind::Dearchive,
        }
    }

    /// Sets the board display name.
    #[must_use]
    pub fn with_board_name(mut self, name: impl Into<String>) -> Self {
        self.board_name = Some(name.into());
        self
    }
}
