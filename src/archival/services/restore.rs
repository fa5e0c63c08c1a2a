//! Rebuilds a board from its latest snapshot.
//!
//! The consumed blob is deleted only after the rebuild has committed; a
//! failed delete is logged and the restore still succeeds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::codec::decode_snapshot;
use super::deadline::before_deadline;
use super::error::{ArchivalError, ArchivalPhase, ArchivalResult, log_failure};
use super::loader::{load_children, stage_child_removals};
use crate::archival::{
    domain::{
        Board, BoardId, BoardMember, BoardSnapshot, Comment, DEFAULT_SNAPSHOT_PREFIX, State,
        StateKeyMap, StateSnapshot, SnapshotLocation, Task,
    },
    ports::{ArchivalStore, BlobStore, Repository, UnitOfWork, stage_inserts},
};

/// What to do with a task whose archived state has no recreated match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedStatePolicy {
    /// Fail the restore as malformed.
    #[default]
    Reject,
    /// Keep the archived key verbatim and log a warning.
    KeepOriginal,
}

impl UnmappedStatePolicy {
    /// Returns the configuration spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::KeepOriginal => "keep_original",
        }
    }
}

impl FromStr for UnmappedStatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "keep_original" | "keep-original" => Ok(Self::KeepOriginal),
            other => Err(format!("unknown unmapped state policy: {other}")),
        }
    }
}

/// Summary of a completed restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReceipt {
    /// Restored board.
    pub board_id: BoardId,
    /// Snapshot blob the board was rebuilt from.
    pub location: SnapshotLocation,
    /// Archived-to-recreated state key translation.
    pub state_id_map: StateKeyMap,
    /// Number of states recreated.
    pub states: usize,
    /// Number of tasks recreated.
    pub tasks: usize,
    /// Number of comments recreated.
    pub comments: usize,
    /// Number of memberships recreated.
    pub members: usize,
    /// Whether the consumed blob was deleted.
    pub reclaimed: bool,
    /// Whether a board row already existed and was overwritten.
    pub replaced_existing: bool,
}

/// Restore engine.
pub struct RestoreService<S, B>
where
    S: ArchivalStore,
    B: BlobStore,
{
    store: Arc<S>,
    blobs: Arc<B>,
    prefix: String,
    policy: UnmappedStatePolicy,
}

impl<S, B> Clone for RestoreService<S, B>
where
    S: ArchivalStore,
    B: BlobStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            blobs: Arc::clone(&self.blobs),
            prefix: self.prefix.clone(),
            policy: self.policy,
        }
    }
}

impl<S, B> RestoreService<S, B>
where
    S: ArchivalStore,
    B: BlobStore,
{
    /// Creates a restore service reading from the default prefix and
    /// rejecting unmapped state references.
    #[must_use]
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self {
            store,
            blobs,
            prefix: DEFAULT_SNAPSHOT_PREFIX.to_owned(),
            policy: UnmappedStatePolicy::default(),
        }
    }

    /// Reads snapshots from `prefix` instead of the default.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the policy for unmapped state references.
    #[must_use]
    pub const fn with_policy(mut self, policy: UnmappedStatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> UnmappedStatePolicy {
        self.policy
    }

    /// Finds the most recent snapshot of `board_id`.
    ///
    /// Names under the board's prefix that do not parse as snapshot
    /// locations are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ArchivalError::NoSnapshot`] when none exists, or the blob
    /// store error when listing fails.
    pub async fn latest_snapshot(&self, board_id: BoardId) -> ArchivalResult<SnapshotLocation> {
        let board_prefix = SnapshotLocation::board_prefix(&self.prefix, board_id);
        let names = self.blobs.list(&board_prefix).await?;
        names
            .iter()
            .filter_map(|name| SnapshotLocation::parse(&self.prefix, name).ok())
            .filter(|location| location.board_id() == board_id)
            .max_by(|left, right| left.name().cmp(&right.name()))
            .ok_or(ArchivalError::NoSnapshot(board_id))
    }

    /// Restores `board_id` from its latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ArchivalError::NoSnapshot`] when no snapshot exists,
    /// [`ArchivalError::Malformed`] when the snapshot cannot be decoded,
    /// names another board or (under [`UnmappedStatePolicy::Reject`]) holds
    /// an unmappable state reference, and a store or blob error when I/O
    /// fails. Nothing is committed on error.
    pub async fn dearchive(&self, board_id: BoardId) -> ArchivalResult<RestoreReceipt> {
        self.dearchive_within(board_id, None).await
    }

    /// Restores `board_id`, abandoning the run when the steps before commit
    /// outlast `limit`. The commit and the blob reclaim after it are never
    /// cut short.
    ///
    /// # Errors
    ///
    /// Returns what [`Self::dearchive`] returns, or
    /// [`ArchivalError::DeadlineExceeded`] when `limit` expires before the
    /// commit starts. Nothing is committed in that case.
    pub async fn dearchive_within(
        &self,
        board_id: BoardId,
        limit: Option<Duration>,
    ) -> ArchivalResult<RestoreReceipt> {
        let span = tracing::info_span!("dearchive_board", %board_id);
        self.run(board_id, limit).instrument(span).await
    }

    async fn run(
        &self,
        board_id: BoardId,
        limit: Option<Duration>,
    ) -> ArchivalResult<RestoreReceipt> {
        let (mut session, mut receipt) =
            before_deadline(board_id, limit, self.stage(board_id)).await?;

        session
            .commit()
            .await
            .map_err(|err| log_failure("dearchive", board_id, ArchivalPhase::Commit, err.into()))?;
        tracing::info!("board restored");

        let name = receipt.location.name();
        receipt.reclaimed = match self.blobs.delete(&name).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(location = %name, error = %err, "failed to reclaim snapshot blob");
                false
            }
        };
        Ok(receipt)
    }

    /// Reads the latest snapshot and stages the rebuilt aggregate on an
    /// uncommitted unit of work. The receipt is not yet reclaimed.
    async fn stage(&self, board_id: BoardId) -> ArchivalResult<(S::Session, RestoreReceipt)> {
        let fail = |phase: ArchivalPhase, err: ArchivalError| {
            log_failure("dearchive", board_id, phase, err)
        };

        let location = self
            .latest_snapshot(board_id)
            .await
            .map_err(|err| fail(ArchivalPhase::Locate, err))?;
        let name = location.name();
        tracing::info!(location = %name, "located latest snapshot");

        let bytes = self
            .blobs
            .download(&name)
            .await
            .map_err(|err| fail(ArchivalPhase::Download, err.into()))?;
        let snapshot = decode_snapshot(&bytes)
            .map_err(|err| fail(ArchivalPhase::Decode, ArchivalError::malformed(&name, err)))?;
        if snapshot.board_id != board_id {
            return Err(fail(
                ArchivalPhase::Decode,
                ArchivalError::malformed(
                    &name,
                    format!("snapshot belongs to board {}", snapshot.board_id),
                ),
            ));
        }

        let mut session = self
            .store
            .begin()
            .await
            .map_err(|err| fail(ArchivalPhase::UpsertBoard, err.into()))?;
        let replaced_existing = upsert_board(&mut session, &snapshot)
            .await
            .map_err(|err| fail(ArchivalPhase::UpsertBoard, err))?;

        let state_id_map = recreate_states(&mut session, board_id, &snapshot.states)
            .await
            .map_err(|err| fail(ArchivalPhase::RemapStates, err))?;
        tracing::info!(
            mapped = state_id_map.len(),
            unmatched = state_id_map.unmatched().len(),
            "recreated states"
        );

        let tasks = self
            .rebuild_tasks(&snapshot, &state_id_map, &name)
            .map_err(|err| fail(ArchivalPhase::RecreateChildren, err))?;
        let task_count = tasks.len();
        stage_inserts::<Task, _>(&mut session, tasks);
        let comments = rebuild_comments(&snapshot);
        let comment_count = comments.len();
        stage_inserts::<Comment, _>(&mut session, comments);
        stage_inserts::<BoardMember, _>(
            &mut session,
            snapshot
                .members
                .iter()
                .map(|member| member.to_member(board_id)),
        );

        let receipt = RestoreReceipt {
            board_id,
            location,
            state_id_map,
            states: snapshot.states.len(),
            tasks: task_count,
            comments: comment_count,
            members: snapshot.members.len(),
            reclaimed: false,
            replaced_existing,
        };
        Ok((session, receipt))
    }

    fn rebuild_tasks(
        &self,
        snapshot: &BoardSnapshot,
        state_id_map: &StateKeyMap,
        location: &str,
    ) -> ArchivalResult<Vec<Task>> {
        snapshot
            .tasks
            .iter()
            .map(|task| {
                let state_id = match (state_id_map.resolve(task.state_id), self.policy) {
                    (Some(mapped), _) => mapped,
                    (None, UnmappedStatePolicy::KeepOriginal) => {
                        tracing::warn!(
                            task_id = %task.id,
                            state_id = %task.state_id,
                            "state reference not remapped; keeping archived key"
                        );
                        task.state_id
                    }
                    (None, UnmappedStatePolicy::Reject) => {
                        return Err(ArchivalError::malformed(
                            location,
                            format!(
                                "task {} references state {} which was not recreated",
                                task.id, task.state_id
                            ),
                        ));
                    }
                };
                Ok(task.to_task(snapshot.board_id, state_id))
            })
            .collect()
    }
}

/// Overwrites or inserts the board row, purging stale children of an
/// existing board. Returns whether a board row already existed.
async fn upsert_board<U>(session: &mut U, snapshot: &BoardSnapshot) -> ArchivalResult<bool>
where
    U: UnitOfWork + ?Sized,
{
    let board_id = snapshot.board_id;
    match Repository::<Board>::get(session, &board_id).await? {
        Some(mut existing) => {
            let stale = load_children(session, board_id).await?;
            if !stale.is_empty() {
                tracing::info!(
                    states = stale.states.len(),
                    tasks = stale.tasks.len(),
                    comments = stale.comments.len(),
                    members = stale.members.len(),
                    "purging children of existing board"
                );
            }
            stage_child_removals(session, &stale);
            existing.restore_from(snapshot.board_fields());
            Repository::<Board>::update(session, existing);
            Ok(true)
        }
        None => {
            Repository::<Board>::add(
                session,
                Board::from_fields(board_id, snapshot.board_fields()),
            );
            Ok(false)
        }
    }
}

/// Inserts fresh states, flushes so the store assigns their keys, and maps
/// the archived keys onto the new ones.
async fn recreate_states<U>(
    session: &mut U,
    board_id: BoardId,
    originals: &[StateSnapshot],
) -> ArchivalResult<StateKeyMap>
where
    U: UnitOfWork + ?Sized,
{
    stage_inserts::<State, U>(
        session,
        originals.iter().map(|state| state.to_new_state(board_id)),
    );
    session.flush().await?;
    let recreated = Repository::<State>::find_by_board(session, board_id).await?;
    Ok(StateKeyMap::build(originals, &recreated))
}

fn rebuild_comments(snapshot: &BoardSnapshot) -> Vec<Comment> {
    snapshot
        .tasks
        .iter()
        .flat_map(|task| {
            task.comments
                .iter()
                .map(move |comment| comment.to_comment(task.id))
        })
        .collect()
}
