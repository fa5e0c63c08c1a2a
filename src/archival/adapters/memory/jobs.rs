//! In-memory job-status repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::archival::{
    domain::{ArchivalJob, BoardId, JobId, JobStatus},
    ports::{JobStatusError, JobStatusRepository, JobStatusResult},
};

/// Thread-safe in-memory job-status repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStatusRepository {
    jobs: Arc<RwLock<HashMap<JobId, ArchivalJob>>>,
}

impl InMemoryJobStatusRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> JobStatusError {
    JobStatusError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl JobStatusRepository for InMemoryJobStatusRepository {
    async fn upsert(&self, job: &ArchivalJob) -> JobStatusResult<()> {
        let mut jobs = self.jobs.write().map_err(lock_error)?;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> JobStatusResult<Option<ArchivalJob>> {
        let jobs = self.jobs.read().map_err(lock_error)?;
        Ok(jobs.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> JobStatusResult<()> {
        let mut jobs = self.jobs.write().map_err(lock_error)?;
        if let Some(job) = jobs.get_mut(&id) {
            job.status = status;
            job.error_message = error_message;
        }
        Ok(())
    }

    async fn list_for_board(&self, board_id: BoardId) -> JobStatusResult<Vec<ArchivalJob>> {
        let jobs = self.jobs.read().map_err(lock_error)?;
        let mut matching: Vec<ArchivalJob> = jobs
            .values()
            .filter(|job| job.board_id == board_id)
            .cloned()
            .collect();
        matching.sort_by_key(|job| job.started_at);
        Ok(matching)
    }
}
