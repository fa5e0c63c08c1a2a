//! Routes inbound archival messages to the engines and tracks job status.

use mockable::Clock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::archive::{ArchiveReceipt, ArchiveService};
use super::error::{ArchivalError, ArchivalResult};
use super::restore::{RestoreReceipt, RestoreService};
use crate::archival::{
    domain::{ArchivalJob, ArchivalMessage, BoardId, JobKind, JobStatus},
    ports::{ArchivalStore, BlobStore, JobStatusRepository},
};

/// Default worker name recorded on job records.
pub const DEFAULT_WORKER_ID: &str = "board-archival-worker";

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The board was archived.
    Archived(ArchiveReceipt),
    /// The board was restored.
    Restored(RestoreReceipt),
    /// The message named an unsupported job type and was dropped.
    Ignored,
}

/// Loosely typed wire form, so an unknown job type can be told apart from
/// a broken message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    board_id: Option<BoardId>,
    #[serde(default)]
    board_name: Option<String>,
    #[serde(default)]
    job_type: Option<String>,
}

/// Message dispatcher over the archive and restore engines.
pub struct ArchivalDispatcher<S, B, J, C>
where
    S: ArchivalStore,
    B: BlobStore,
    J: JobStatusRepository,
    C: Clock + Send + Sync,
{
    archive: ArchiveService<S, B, C>,
    restore: RestoreService<S, B>,
    jobs: Arc<J>,
    clock: Arc<C>,
    worker_id: String,
    deadline: Option<Duration>,
}

impl<S, B, J, C> ArchivalDispatcher<S, B, J, C>
where
    S: ArchivalStore,
    B: BlobStore,
    J: JobStatusRepository,
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher with no deadline.
    #[must_use]
    pub fn new(
        archive: ArchiveService<S, B, C>,
        restore: RestoreService<S, B>,
        jobs: Arc<J>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            archive,
            restore,
            jobs,
            clock,
            worker_id: DEFAULT_WORKER_ID.to_owned(),
            deadline: None,
        }
    }

    /// Sets the worker name recorded on job records.
    #[must_use]
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// Bounds the steps of each engine run that precede its commit by
    /// `deadline`. A commit that has started always finishes, so the
    /// recorded outcome matches what the store holds.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Parses and handles one JSON message.
    ///
    /// # Errors
    ///
    /// Returns [`ArchivalError::InvalidMessage`] when `raw` is not a JSON
    /// object with a board id, and otherwise whatever [`Self::handle`]
    /// returns.
    pub async fn handle_raw(&self, raw: &str) -> ArchivalResult<DispatchOutcome> {
        let parsed: RawMessage = serde_json::from_str(raw).map_err(|err| {
            tracing::warn!(error = %err, "rejecting unparseable archival message");
            ArchivalError::InvalidMessage(err.to_string())
        })?;
        let Some(board_id) = parsed.board_id else {
            tracing::warn!("rejecting archival message without a board id");
            return Err(ArchivalError::InvalidMessage(
                "message has no boardId".to_owned(),
            ));
        };
        let requested = parsed.job_type.unwrap_or_default();
        let Ok(job_type) = JobKind::try_from(requested.as_str()) else {
            tracing::warn!(%board_id, job_type = %requested, "ignoring unknown job type");
            return Ok(DispatchOutcome::Ignored);
        };

        self.handle(ArchivalMessage {
            board_id,
            board_name: parsed.board_name,
            job_type,
        })
        .await
    }

    /// Runs the engine named by `message` and records its job status.
    ///
    /// Job-status write failures are logged and never fail the run.
    ///
    /// # Errors
    ///
    /// Returns the engine error, or [`ArchivalError::DeadlineExceeded`] when
    /// the configured deadline expires before the run reaches its commit.
    pub async fn handle(&self, message: ArchivalMessage) -> ArchivalResult<DispatchOutcome> {
        let board_id = message.board_id;
        tracing::info!(
            %board_id,
            board_name = message.board_name.as_deref().unwrap_or_default(),
            job_type = %message.job_type,
            "processing archival message"
        );

        let mut job = ArchivalJob::pending(board_id, message.job_type, &*self.clock);
        job.processed_by = Some(self.worker_id.clone());
        self.record(&job).await;
        job.transition(JobStatus::Running, &*self.clock);
        self.record(&job).await;

        let result = self.run_engine(board_id, message.job_type).await;
        match &result {
            Ok(outcome) => {
                describe_outcome(&mut job, outcome);
                job.transition(JobStatus::Completed, &*self.clock);
            }
            Err(err) => {
                job.error_message = Some(err.to_string());
                job.transition(JobStatus::Failed, &*self.clock);
            }
        }
        self.record(&job).await;
        result
    }

    async fn run_engine(
        &self,
        board_id: BoardId,
        job_type: JobKind,
    ) -> ArchivalResult<DispatchOutcome> {
        match job_type {
            JobKind::Archive => self
                .archive
                .archive_within(board_id, None, self.deadline)
                .await
                .map(DispatchOutcome::Archived),
            JobKind::Dearchive => self
                .restore
                .dearchive_within(board_id, self.deadline)
                .await
                .map(DispatchOutcome::Restored),
        }
    }

    async fn record(&self, job: &ArchivalJob) {
        if let Err(err) = self.jobs.upsert(job).await {
            tracing::warn!(
                job_id = %job.id,
                board_id = %job.board_id,
                status = job.status.as_str(),
                error = %err,
                "failed to record archival job status"
            );
        }
    }
}

fn describe_outcome(job: &mut ArchivalJob, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Archived(receipt) => {
            job.blob_path = Some(receipt.location.name());
            job.metadata = Some(format!("sha256={}", receipt.digest));
        }
        DispatchOutcome::Restored(receipt) => {
            job.blob_path = Some(receipt.location.name());
        }
        DispatchOutcome::Ignored => {}
    }
}
