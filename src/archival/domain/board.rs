//! Board aggregate root and its archival lifecycle.

use super::{BoardId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Board aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    id: BoardId,
    name: String,
    description: Option<String>,
    owner_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived: bool,
    archived_at: Option<DateTime<Utc>>,
    archival_reason: Option<String>,
}

/// Parameter object for reconstructing a persisted board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBoardData {
    /// Persisted board identifier.
    pub id: BoardId,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Owning user.
    pub owner_id: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Whether the board currently lives in cold storage.
    pub archived: bool,
    /// When the board was archived, if it is archived.
    pub archived_at: Option<DateTime<Utc>>,
    /// Optional operator-supplied reason for archival.
    pub archival_reason: Option<String>,
}

/// Mutable board fields carried by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFields {
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Owning user.
    pub owner_id: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional reason recorded at archival time.
    pub archival_reason: Option<String>,
}

impl Board {
    /// Creates a new, live board owned by `owner_id`.
    #[must_use]
    pub fn new(name: impl Into<String>, owner_id: UserId, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: BoardId::new(),
            name: name.into(),
            description: None,
            owner_id,
            created_at: timestamp,
            updated_at: timestamp,
            archived: false,
            archived_at: None,
            archival_reason: None,
        }
    }

    /// Sets the board description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reconstructs a board from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBoardData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            description: data.description,
            owner_id: data.owner_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
            archived: data.archived,
            archived_at: data.archived_at,
            archival_reason: data.archival_reason,
        }
    }

    /// Builds a live board with a known identity from snapshot fields.
    #[must_use]
    pub fn from_fields(id: BoardId, fields: BoardFields) -> Self {
        Self {
            id,
            name: fields.name,
            description: fields.description,
            owner_id: fields.owner_id,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
            archived: false,
            archived_at: None,
            archival_reason: fields.archival_reason,
        }
    }

    /// Returns the board identifier.
    #[must_use]
    pub const fn id(&self) -> BoardId {
        self.id
    }

    /// Returns the board name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the board description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the board is archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived
    }

    /// Returns when the board was archived.
    #[must_use]
    pub const fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    /// Returns the archival reason, if one was recorded.
    #[must_use]
    pub fn archival_reason(&self) -> Option<&str> {
        self.archival_reason.as_deref()
    }

    /// Returns the snapshot-carried fields of this board.
    #[must_use]
    pub fn fields(&self) -> BoardFields {
        BoardFields {
            name: self.name.clone(),
            description: self.description.clone(),
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            archival_reason: self.archival_reason.clone(),
        }
    }

    /// Flags the board as archived.
    ///
    /// Returns `false` without touching `archived_at` when the board is
    /// already archived.
    pub fn mark_archived(&mut self, clock: &impl Clock) -> bool {
        if self.archived {
            return false;
        }
        self.archived = true;
        self.archived_at = Some(clock.utc());
        true
    }

    /// Records why the board is being archived.
    pub fn set_archival_reason(&mut self, reason: impl Into<String>) {
        self.archival_reason = Some(reason.into());
    }

    /// Overwrites mutable fields from a snapshot and brings the board back
    /// to life.
    pub fn restore_from(&mut self, fields: BoardFields) {
        self.name = fields.name;
        self.description = fields.description;
        self.owner_id = fields.owner_id;
        self.created_at = fields.created_at;
        self.updated_at = fields.updated_at;
        self.archival_reason = fields.archival_reason;
        self.archived = false;
        self.archived_at = None;
    }
}
