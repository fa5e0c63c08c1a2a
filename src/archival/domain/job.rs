//! Status records for archival jobs.

use super::{BoardId, JobId, JobKind, ParseJobStatusError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Progress of an archival job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted but not started.
    Pending,
    /// Engine run in progress.
    Running,
    /// Engine run committed.
    Completed,
    /// Engine run aborted.
    Failed,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for statuses that end a job.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseJobStatusError(value.to_owned())),
        }
    }
}

/// Record of one archive or dearchive run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivalJob {
    /// Job identifier.
    pub id: JobId,
    /// Board the job targets.
    pub board_id: BoardId,
    /// Requested operation.
    pub job_type: JobKind,
    /// Current status.
    pub status: JobStatus,
    /// When the job was accepted.
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Snapshot blob written or consumed by the job.
    pub blob_path: Option<String>,
    /// Failure description for failed jobs.
    pub error_message: Option<String>,
    /// Worker that processed the job.
    pub processed_by: Option<String>,
    /// Free-form metadata, such as the snapshot digest.
    pub metadata: Option<String>,
}

impl ArchivalJob {
    /// Creates a pending job for `board_id`.
    #[must_use]
    pub fn pending(board_id: BoardId, job_type: JobKind, clock: &impl Clock) -> Self {
        Self {
            id: JobId::new(),
            board_id,
            job_type,
            status: JobStatus::Pending,
            started_at: clock.utc(),
            completed_at: None,
            blob_path: None,
            error_message: None,
            processed_by: None,
            metadata: None,
        }
    }

    /// Moves the job to `status`, stamping completion for terminal statuses.
    pub fn transition(&mut self, status: JobStatus, clock: &impl Clock) {
        self.status = status;
        if status.is_terminal() {
            self.completed_at = Some(clock.utc());
        }
    }
}
