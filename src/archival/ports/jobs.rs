//! Job-status port for archival job records.

use crate::archival::domain::{ArchivalJob, BoardId, JobId, JobStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for job-status operations.
pub type JobStatusResult<T> = Result<T, JobStatusError>;

/// Storage for [`ArchivalJob`] records.
#[async_trait]
pub trait JobStatusRepository: Send + Sync {
    /// Inserts or replaces a job record.
    async fn upsert(&self, job: &ArchivalJob) -> JobStatusResult<()>;

    /// Fetches a job record by identifier.
    async fn get(&self, id: JobId) -> JobStatusResult<Option<ArchivalJob>>;

    /// Sets the status and error message of an existing job.
    ///
    /// A missing job is ignored, matching upsert-on-write document stores.
    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> JobStatusResult<()>;

    /// Returns every job recorded for `board_id`, oldest first.
    async fn list_for_board(&self, board_id: BoardId) -> JobStatusResult<Vec<ArchivalJob>>;
}

/// Errors returned by job-status implementations.
#[derive(Debug, Clone, Error)]
pub enum JobStatusError {
    /// Persistence-layer failure.
    #[error("job status persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl JobStatusError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
