//! `PostgreSQL` repository for archival job records.

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;

use super::models::ArchivalJobRow;
use super::schema::archival_jobs;
use super::store::ArchivalPgPool;
use crate::archival::{
    domain::{ArchivalJob, BoardId, JobId, JobKind, JobStatus},
    ports::{JobStatusError, JobStatusRepository, JobStatusResult},
};

/// `PostgreSQL`-backed job-status repository.
#[derive(Debug, Clone)]
pub struct PostgresJobStatusRepository {
    pool: ArchivalPgPool,
}

impl PostgresJobStatusRepository {
    /// Creates a repository from a connection pool.
    #[must_use]
    pub const fn new(pool: ArchivalPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> JobStatusResult<T>
    where
        F: FnOnce(&mut PgConnection) -> JobStatusResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(JobStatusError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(JobStatusError::persistence)?
    }
}

#[async_trait]
impl JobStatusRepository for PostgresJobStatusRepository {
    async fn upsert(&self, job: &ArchivalJob) -> JobStatusResult<()> {
        let row = to_row(job);
        self.run_blocking(move |connection| {
            diesel::insert_into(archival_jobs::table)
                .values(&row)
                .on_conflict(archival_jobs::id)
                .do_update()
                .set(&row)
                .execute(connection)
                .map_err(JobStatusError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: JobId) -> JobStatusResult<Option<ArchivalJob>> {
        self.run_blocking(move |connection| {
            let row = archival_jobs::table
                .find(id.into_inner())
                .select(ArchivalJobRow::as_select())
                .first::<ArchivalJobRow>(connection)
                .optional()
                .map_err(JobStatusError::persistence)?;
            row.map(row_to_job).transpose()
        })
        .await
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> JobStatusResult<()> {
        self.run_blocking(move |connection| {
            diesel::update(archival_jobs::table.find(id.into_inner()))
                .set((
                    archival_jobs::status.eq(status.as_str()),
                    archival_jobs::error_message.eq(error_message),
                ))
                .execute(connection)
                .map_err(JobStatusError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn list_for_board(&self, board_id: BoardId) -> JobStatusResult<Vec<ArchivalJob>> {
        self.run_blocking(move |connection| {
            let rows = archival_jobs::table
                .filter(archival_jobs::board_id.eq(board_id.into_inner()))
                .order(archival_jobs::started_at.asc())
                .select(ArchivalJobRow::as_select())
                .load::<ArchivalJobRow>(connection)
                .map_err(JobStatusError::persistence)?;
            rows.into_iter().map(row_to_job).collect()
        })
        .await
    }
}

fn to_row(job: &ArchivalJob) -> ArchivalJobRow {
    ArchivalJobRow {
        id: job.id.into_inner(),
        board_id: job.board_id.into_inner(),
        job_type: job.job_type.as_str().to_owned(),
        status: job.status.as_str().to_owned(),
        started_at: job.started_at,
        completed_at: job.completed_at,
        blob_path: job.blob_path.clone(),
        error_message: job.error_message.clone(),
        processed_by: job.processed_by.clone(),
        metadata: job.metadata.clone(),
    }
}

fn row_to_job(row: ArchivalJobRow) -> JobStatusResult<ArchivalJob> {
    let job_type =
        JobKind::try_from(row.job_type.as_str()).map_err(JobStatusError::persistence)?;
    let status = JobStatus::try_from(row.status.as_str()).map_err(JobStatusError::persistence)?;
    Ok(ArchivalJob {
        id: JobId::from_uuid(row.id),
        board_id: BoardId::from_uuid(row.board_id),
        job_type,
        status,
        started_at: row.started_at,
        completed_at: row.completed_at,
        blob_path: row.blob_path,
        error_message: row.error_message,
        processed_by: row.processed_by,
        metadata: row.metadata,
    })
}
