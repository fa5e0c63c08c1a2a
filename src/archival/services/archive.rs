//! Moves a live board into cold storage.
//!
//! The run loads the aggregate, uploads its snapshot, then marks the board
//! archived and deletes its children in one commit. The upload happens
//! before anything is staged, so a failed upload leaves the store untouched
//! and a failed commit leaves a snapshot behind that a later restore can use.
//! Snapshot blobs are write-once, so a run whose snapshot name is already
//! taken fails at upload instead of replacing an earlier snapshot.

use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::codec::encode_snapshot;
use super::deadline::before_deadline;
use super::error::{ArchivalError, ArchivalPhase, ArchivalResult, log_failure};
use super::loader::{BoardChildren, load_aggregate, stage_child_removals};
use crate::archival::{
    domain::{
        Board, BoardAggregate, BoardId, BoardSnapshot, DEFAULT_SNAPSHOT_PREFIX,
        SNAPSHOT_CONTENT_TYPE, SnapshotLocation,
    },
    ports::{ArchivalStore, BlobStore, Repository, UnitOfWork},
};

/// Summary of a completed archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    /// Archived board.
    pub board_id: BoardId,
    /// Blob the snapshot was written to.
    pub location: SnapshotLocation,
    /// Number of states snapshotted and deleted.
    pub states: usize,
    /// Number of tasks snapshotted and deleted.
    pub tasks: usize,
    /// Number of comments snapshotted and deleted.
    pub comments: usize,
    /// Number of memberships snapshotted and deleted.
    pub members: usize,
    /// Whether the board was already archived before this run.
    pub already_archived: bool,
    /// Hex SHA-256 digest of the uploaded bytes.
    pub digest: String,
}

/// Archive engine.
pub struct ArchiveService<S, B, C>
where
    S: ArchivalStore,
    B: BlobStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    blobs: Arc<B>,
    clock: Arc<C>,
    prefix: String,
}

impl<S, B, C> Clone for ArchiveService<S, B, C>
where
    S: ArchivalStore,
    B: BlobStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            blobs: Arc::clone(&self.blobs),
            clock: Arc::clone(&self.clock),
            prefix: self.prefix.clone(),
        }
    }
}

impl<S, B, C> ArchiveService<S, B, C>
where
    S: ArchivalStore,
    B: BlobStore,
    C: Clock + Send + Sync,
{
    /// Creates an archive service writing under the default prefix.
    #[must_use]
    pub fn new(store: Arc<S>, blobs: Arc<B>, clock: Arc<C>) -> Self {
        Self {
            store,
            blobs,
            clock,
            prefix: DEFAULT_SNAPSHOT_PREFIX.to_owned(),
        }
    }

    /// Writes snapshots under `prefix` instead of the default.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the snapshot prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Archives `board_id`, recording `reason` when the board is live.
    ///
    /// # Errors
    ///
    /// Returns [`ArchivalError::NotFound`] when the board does not exist,
    /// [`ArchivalError::Malformed`] when the snapshot cannot be encoded, and
    /// a store or blob error when I/O fails. A snapshot name that is already
    /// taken fails the upload. Nothing is committed on error.
    pub async fn archive(
        &self,
        board_id: BoardId,
        reason: Option<String>,
    ) -> ArchivalResult<ArchiveReceipt> {
        self.archive_within(board_id, reason, None).await
    }

    /// Archives `board_id`, abandoning the run when the steps before commit
    /// outlast `limit`. A commit that has started is never cut short.
    ///
    /// # Errors
    ///
    /// Returns what [`Self::archive`] returns, or
    /// [`ArchivalError::DeadlineExceeded`] when `limit` expires before the
    /// commit starts. Nothing is committed in that case.
    pub async fn archive_within(
        &self,
        board_id: BoardId,
        reason: Option<String>,
        limit: Option<Duration>,
    ) -> ArchivalResult<ArchiveReceipt> {
        let span = tracing::info_span!("archive_board", %board_id);
        self.run(board_id, reason, limit).instrument(span).await
    }

    async fn run(
        &self,
        board_id: BoardId,
        reason: Option<String>,
        limit: Option<Duration>,
    ) -> ArchivalResult<ArchiveReceipt> {
        let (mut session, receipt) =
            before_deadline(board_id, limit, self.stage(board_id, reason)).await?;

        session
            .commit()
            .await
            .map_err(|err| log_failure("archive", board_id, ArchivalPhase::Commit, err.into()))?;
        tracing::info!("board archived");
        Ok(receipt)
    }

    /// Loads and uploads the snapshot, then stages the mark and the child
    /// deletions on an uncommitted unit of work.
    async fn stage(
        &self,
        board_id: BoardId,
        reason: Option<String>,
    ) -> ArchivalResult<(S::Session, ArchiveReceipt)> {
        let fail =
            |phase: ArchivalPhase, err: ArchivalError| log_failure("archive", board_id, phase, err);

        let mut session = self
            .store
            .begin()
            .await
            .map_err(|err| fail(ArchivalPhase::Load, err.into()))?;
        let mut aggregate = load_aggregate(&mut session, board_id)
            .await
            .map_err(|err| fail(ArchivalPhase::Load, err.into()))?
            .ok_or_else(|| fail(ArchivalPhase::Load, ArchivalError::NotFound(board_id)))?;

        let already_archived = aggregate.board.is_archived();
        if let Some(text) = reason.filter(|_| !already_archived) {
            aggregate.board.set_archival_reason(text);
        }
        tracing::info!(
            states = aggregate.states.len(),
            tasks = aggregate.tasks.len(),
            comments = aggregate.comments.len(),
            members = aggregate.members.len(),
            already_archived,
            "loaded board aggregate"
        );

        let location = SnapshotLocation::new(&self.prefix, board_id, self.clock.utc());
        let encoded = encode_snapshot(&BoardSnapshot::from_aggregate(&aggregate)).map_err(|err| {
            fail(
                ArchivalPhase::Encode,
                ArchivalError::malformed(location.name(), err),
            )
        })?;
        let digest = encoded.digest.clone();
        self.blobs
            .upload(&location.name(), encoded.bytes, SNAPSHOT_CONTENT_TYPE)
            .await
            .map_err(|err| fail(ArchivalPhase::Upload, err.into()))?;
        tracing::info!(location = %location, %digest, "uploaded board snapshot");

        let BoardAggregate {
            mut board,
            states,
            tasks,
            comments,
            members,
        } = aggregate;
        let children = BoardChildren {
            states,
            tasks,
            comments,
            members,
        };
        if board.mark_archived(&*self.clock) {
            Repository::<Board>::update(&mut session, board);
        } else {
            tracing::info!("board already archived; leaving archived-at unchanged");
        }
        stage_child_removals(&mut session, &children);

        let receipt = ArchiveReceipt {
            board_id,
            location,
            states: children.states.len(),
            tasks: children.tasks.len(),
            comments: children.comments.len(),
            members: children.members.len(),
            already_archived,
            digest,
        };
        Ok((session, receipt))
    }
}
