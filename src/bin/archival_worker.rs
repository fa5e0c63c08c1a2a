//! Consumes archival messages from stdin and runs them against Postgres and
//! a filesystem blob store.
//!
//! Usage:
//!
//! ```text
//! ARCHIVAL_BLOB_ROOT=/var/lib/archivals DATABASE_URL=postgres://... archival_worker
//! ```
//!
//! Each input line is one JSON message:
//!
//! ```json
//! {"boardId": "6f1c2a4e-8d2b-4d0e-9c1a-3b5e7f9a0c2d", "boardName": "Sprint 1", "jobType": "archive"}
//! ```
//!
//! Blank lines are skipped. The worker stops with a non-zero exit status at
//! the first message that fails, leaving the remaining input unread so the
//! delivery layer can redeliver it.

use board_archival::archival::adapters::filesystem::FsBlobStore;
use board_archival::archival::adapters::postgres::{
    PostgresArchivalStore, PostgresJobStatusRepository, build_pool,
};
use board_archival::archival::ports::{
    ArchivalStore, BlobStore, BlobStoreError, JobStatusRepository, StoreError,
};
use board_archival::archival::services::{
    ArchivalDispatcher, ArchivalError, ArchiveService, DispatchOutcome, RestoreService,
};
use board_archival::config::{ArchivalConfig, ConfigError};
use board_archival::telemetry::{TelemetryError, init_tracing};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

type PgDispatcher = ArchivalDispatcher<
    PostgresArchivalStore,
    FsBlobStore,
    PostgresJobStatusRepository,
    DefaultClock,
>;

/// Errors that stop the worker.
#[derive(Debug, Error)]
enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to connect to the database: {0}")]
    Database(#[from] StoreError),
    #[error("failed to open the blob root: {0}")]
    BlobRoot(#[from] BlobStoreError),
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
    #[error("message on line {line} failed: {source}")]
    Message { line: usize, source: ArchivalError },
}

/// Counts of handled messages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunSummary {
    archived: usize,
    restored: usize,
    ignored: usize,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = ArchivalConfig::from_env().map_err(WorkerError::from)?;
    init_tracing(config.log_format).map_err(WorkerError::from)?;
    let dispatcher = build_dispatcher(&config)?;
    tracing::info!(
        worker_id = %config.worker_id,
        blob_root = %config.blob_root(),
        prefix = %config.blob_prefix,
        policy = config.unmapped_state_policy.as_str(),
        "archival worker ready"
    );

    let summary = run(&dispatcher, BufReader::new(tokio::io::stdin())).await?;
    tracing::info!(
        archived = summary.archived,
        restored = summary.restored,
        ignored = summary.ignored,
        "input exhausted; archival worker exiting"
    );
    Ok(())
}

fn build_dispatcher(config: &ArchivalConfig) -> Result<PgDispatcher, WorkerError> {
    let pool = build_pool(config.database_url()?, config.db_pool_size)?;
    let store = Arc::new(PostgresArchivalStore::new(pool.clone()));
    let blobs = Arc::new(FsBlobStore::open(config.blob_root())?);
    let jobs = Arc::new(PostgresJobStatusRepository::new(pool));
    let clock = Arc::new(DefaultClock);

    let archive = ArchiveService::new(Arc::clone(&store), Arc::clone(&blobs), Arc::clone(&clock))
        .with_prefix(config.blob_prefix.as_str());
    let restore = RestoreService::new(store, blobs)
        .with_prefix(config.blob_prefix.as_str())
        .with_policy(config.unmapped_state_policy);
    Ok(ArchivalDispatcher::new(archive, restore, jobs, clock)
        .with_worker_id(config.worker_id.as_str())
        .with_deadline(config.job_deadline()))
}

/// Dispatches every non-blank line of `input`, stopping at the first
/// failure.
async fn run<S, B, J, C, R>(
    dispatcher: &ArchivalDispatcher<S, B, J, C>,
    input: R,
) -> Result<RunSummary, WorkerError>
where
    S: ArchivalStore,
    B: BlobStore,
    J: JobStatusRepository,
    C: Clock + Send + Sync,
    R: AsyncBufRead + Unpin,
{
    let mut summary = RunSummary::default();
    let mut lines = input.lines();
    let mut line_number = 0_usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match dispatcher.handle_raw(&line).await {
            Ok(DispatchOutcome::Archived(_)) => summary.archived += 1,
            Ok(DispatchOutcome::Restored(_)) => summary.restored += 1,
            Ok(DispatchOutcome::Ignored) => summary.ignored += 1,
            Err(source) => {
                tracing::error!(line = line_number, error = %source, "stopping at failed message");
                return Err(WorkerError::Message {
                    line: line_number,
                    source,
                });
            }
        }
    }
    Ok(summary)
}
