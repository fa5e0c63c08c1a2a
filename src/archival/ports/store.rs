//! Relational store port: per-entity repositories behind one unit of work.
//!
//! Writes are staged on the unit of work and reach the store only on
//! [`UnitOfWork::flush`] or [`UnitOfWork::commit`]. A flush runs the staged
//! writes inside the open transaction, so store-assigned keys become visible
//! to later reads without anything being durable yet. Dropping a unit of
//! work without committing discards everything it did.

use crate::archival::domain::{
    Board, BoardId, BoardMember, Comment, CommentId, NewState, State, StateId, Task, TaskId,
    UserId,
};
use async_trait::async_trait;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;

/// Result type for relational store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Kinds of rows held by the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Board rows.
    Board,
    /// Workflow state rows.
    State,
    /// Task rows.
    Task,
    /// Comment rows.
    Comment,
    /// Board membership rows.
    BoardMember,
}

impl EntityKind {
    /// Returns the storage name of the entity kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::State => "state",
            Self::Task => "task",
            Self::Comment => "comment",
            Self::BoardMember => "board member",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row type the unit of work can load and stage writes for.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Key identifying one row.
    type Key: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static;

    /// Insert payload. Entities with store-assigned keys insert a draft
    /// without the key; all others insert themselves.
    type Draft: Clone + Send + Sync + 'static;

    /// Kind reported in errors.
    const KIND: EntityKind;

    /// Returns the row key.
    fn key(&self) -> Self::Key;
}

impl Entity for Board {
    type Key = BoardId;
    type Draft = Self;
    const KIND: EntityKind = EntityKind::Board;

    fn key(&self) -> Self::Key {
        self.id()
    }
}

impl Entity for State {
    type Key = StateId;
    type Draft = NewState;
    const KIND: EntityKind = EntityKind::State;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl Entity for Task {
    type Key = TaskId;
    type Draft = Self;
    const KIND: EntityKind = EntityKind::Task;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl Entity for Comment {
    type Key = CommentId;
    type Draft = Self;
    const KIND: EntityKind = EntityKind::Comment;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl Entity for BoardMember {
    type Key = (BoardId, UserId);
    type Draft = Self;
    const KIND: EntityKind = EntityKind::BoardMember;

    fn key(&self) -> Self::Key {
        (self.board_id, self.user_id)
    }
}

/// Repository capability for one entity kind.
///
/// Reads observe flushed writes of the same unit of work but not writes that
/// are still staged.
#[async_trait]
pub trait Repository<E: Entity>: Send {
    /// Fetches one row by key.
    async fn get(&mut self, key: &E::Key) -> StoreResult<Option<E>>;

    /// Fetches every row belonging to `board_id`.
    ///
    /// Comments belong to the board of their task. Rows come back in store
    /// order (ascending key for states).
    async fn find_by_board(&mut self, board_id: BoardId) -> StoreResult<Vec<E>>;

    /// Stages an insert.
    fn add(&mut self, draft: E::Draft);

    /// Stages an overwrite of an existing row.
    fn update(&mut self, entity: E);

    /// Stages a delete by key.
    fn remove(&mut self, key: E::Key);
}

/// One transactional batch of reads and staged writes over every entity kind.
#[async_trait]
pub trait UnitOfWork:
    Repository<Board>
    + Repository<State>
    + Repository<Task>
    + Repository<Comment>
    + Repository<BoardMember>
    + Send
{
    /// Runs staged writes inside the open transaction.
    ///
    /// Deletes run first (comments, tasks, states, members, boards), then
    /// board updates and inserts, then child updates and inserts (states,
    /// tasks, comments, members). Store-assigned keys are allocated here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store rejects any staged write. The
    /// unit of work must then be dropped.
    async fn flush(&mut self) -> StoreResult<()>;

    /// Flushes outstanding writes and makes the whole unit of work durable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when flushing or committing fails; nothing is
    /// durable in that case.
    async fn commit(&mut self) -> StoreResult<()>;
}

/// Source of units of work.
#[async_trait]
pub trait ArchivalStore: Send + Sync {
    /// Unit of work type produced by this store.
    type Session: UnitOfWork;

    /// Opens a new unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store is unreachable.
    async fn begin(&self) -> StoreResult<Self::Session>;
}

/// Stages removal of every row in `rows`.
pub fn stage_removals<E, U>(session: &mut U, rows: &[E])
where
    E: Entity,
    U: Repository<E> + ?Sized,
{
    for row in rows {
        session.remove(row.key());
    }
}

/// Stages insertion of every draft in `drafts`.
pub fn stage_inserts<E, U>(session: &mut U, drafts: impl IntoIterator<Item = E::Draft>)
where
    E: Entity,
    U: Repository<E> + ?Sized,
{
    for draft in drafts {
        session.add(draft);
    }
}

/// Errors returned by relational store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A staged update or delete targets a row that does not exist.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Entity kind of the missing row.
        kind: EntityKind,
        /// Rendered key of the missing row.
        key: String,
    },

    /// A staged insert reuses an existing key.
    #[error("duplicate {kind}: {key}")]
    Duplicate {
        /// Entity kind of the duplicate row.
        kind: EntityKind,
        /// Rendered key of the duplicate row.
        key: String,
    },

    /// A uniqueness or referential constraint rejected the batch.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The unit of work was already committed or failed.
    #[error("unit of work is closed")]
    Closed,

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Builds a not-found error for an entity key.
    pub fn not_found<E: Entity>(key: &E::Key) -> Self {
        Self::NotFound {
            kind: E::KIND,
            key: format!("{key:?}"),
        }
    }

    /// Builds a duplicate-key error for an entity key.
    pub fn duplicate<E: Entity>(key: &E::Key) -> Self {
        Self::Duplicate {
            kind: E::KIND,
            key: format!("{key:?}"),
        }
    }
}
