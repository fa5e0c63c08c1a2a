//! Blob names for archived snapshots.
//!
//! Names have the shape `{prefix}/{board-id}_{timestamp}.json`, where the
//! timestamp is UTC rendered as 17 fixed-width digits (`YYYYMMDDhhmmssSSS`).
//! Fixed width makes lexicographic order of names equal chronological order,
//! so the latest snapshot of a board is the greatest name under its prefix.

use super::{ArchivalDomainError, BoardId};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use std::fmt;
use uuid::Uuid;

/// Default directory-like prefix for snapshot blobs.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "archivals";

/// File extension of encoded snapshots.
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Content type recorded on uploaded snapshots.
pub const SNAPSHOT_CONTENT_TYPE: &str = "application/json";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";
const TIMESTAMP_WIDTH: usize = 17;

/// Location of one snapshot blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotLocation {
    prefix: String,
    board_id: BoardId,
    taken_at: DateTime<Utc>,
}

impl SnapshotLocation {
    /// Creates a location for a snapshot of `board_id` taken at `taken_at`.
    ///
    /// The timestamp is truncated to millisecond precision, matching what
    /// the name can represent.
    #[must_use]
    pub fn new(prefix: impl Into<String>, board_id: BoardId, taken_at: DateTime<Utc>) -> Self {
        Self {
            prefix: normalize_prefix(&prefix.into()),
            board_id,
            taken_at: taken_at.trunc_subsecs(3),
        }
    }

    /// Returns the listing prefix shared by every snapshot of `board_id`.
    #[must_use]
    pub fn board_prefix(prefix: &str, board_id: BoardId) -> String {
        format!("{}/{board_id}_", normalize_prefix(prefix))
    }

    /// Parses a blob name produced by [`SnapshotLocation::name`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchivalDomainError::InvalidSnapshotLocation`] when the name
    /// does not follow the snapshot naming scheme under `prefix`.
    pub fn parse(prefix: &str, name: &str) -> Result<Self, ArchivalDomainError> {
        let invalid = || ArchivalDomainError::InvalidSnapshotLocation(name.to_owned());
        let normalized = normalize_prefix(prefix);
        let file_name = name
            .strip_prefix(normalized.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(invalid)?;
        let stem = file_name
            .strip_suffix(SNAPSHOT_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or_else(invalid)?;
        let (raw_board_id, raw_timestamp) = stem.rsplit_once('_').ok_or_else(invalid)?;
        let board_id = Uuid::parse_str(raw_board_id)
            .map(BoardId::from_uuid)
            .map_err(|_| invalid())?;
        let taken_at = parse_timestamp(raw_timestamp).ok_or_else(invalid)?;

        Ok(Self {
            prefix: normalized,
            board_id,
            taken_at,
        })
    }

    /// Returns the board the snapshot belongs to.
    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Returns the full blob name.
    #[must_use]
    pub fn name(&self) -> String {
        format!(
            "{}/{}_{}.{SNAPSHOT_EXTENSION}",
            self.prefix,
            self.board_id,
            self.taken_at.format(TIMESTAMP_FORMAT)
        )
    }
}

impl fmt::Display for SnapshotLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_matches('/').to_owned()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != TIMESTAMP_WIDTH || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let field = |start: usize, end: usize| raw.get(start..end)?.parse::<u32>().ok();
    let year = i32::try_from(field(0, 4)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 6)?, field(6, 8)?)?;
    let time = date.and_hms_milli_opt(field(8, 10)?, field(10, 12)?, field(12, 14)?, field(14, 17)?)?;
    Some(time.and_utc())
}
