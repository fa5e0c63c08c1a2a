//! In-memory relational store with transactional units of work.
//!
//! A session reads from a private copy of the tables taken when it began.
//! Flushing applies staged writes to that copy and records them in a journal;
//! committing replays the journal against the shared tables under one write
//! lock, so a failed or abandoned session leaves the shared tables untouched.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};

use crate::archival::{
    domain::{
        Board, BoardAggregate, BoardId, BoardMember, Comment, CommentId, NewState, State, StateId,
        Task, TaskId, UserId,
    },
    ports::{ArchivalStore, Entity, Repository, StoreError, StoreResult, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    boards: BTreeMap<BoardId, Board>,
    states: BTreeMap<StateId, State>,
    tasks: BTreeMap<TaskId, Task>,
    comments: BTreeMap<CommentId, Comment>,
    members: BTreeMap<(BoardId, UserId), BoardMember>,
}

/// State key sequence shared by every session of one store. Keys are never
/// reused, even when the session that drew them is rolled back.
#[derive(Debug)]
struct StateSequence(AtomicI32);

impl Default for StateSequence {
    fn default() -> Self {
        Self(AtomicI32::new(1))
    }
}

impl StateSequence {
    fn next(&self) -> StateId {
        StateId::new(self.0.fetch_add(1, Ordering::SeqCst))
    }

    fn observe(&self, id: StateId) {
        self.0
            .fetch_max(id.value().saturating_add(1), Ordering::SeqCst);
    }
}

fn lock_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::persistence(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory implementation of [`ArchivalStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryArchivalStore {
    tables: Arc<RwLock<Tables>>,
    sequence: Arc<StateSequence>,
}

impl InMemoryArchivalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an aggregate as-is, keeping its state keys.
    ///
    /// Later state inserts draw keys above every seeded key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a row already exists or the aggregate
    /// violates a store constraint.
    pub fn seed(&self, aggregate: &BoardAggregate) -> StoreResult<()> {
        let mut changes = ChangeSet::default();
        changes.boards.inserts.push(aggregate.board.clone());
        changes.states.inserts.extend(aggregate.states.iter().cloned());
        changes.tasks.inserts.extend(aggregate.tasks.iter().cloned());
        changes
            .comments
            .inserts
            .extend(aggregate.comments.iter().cloned());
        changes
            .members
            .inserts
            .extend(aggregate.members.iter().cloned());

        let mut tables = self.tables.write().map_err(lock_error)?;
        let mut next = tables.clone();
        changes.apply_to(&mut next)?;
        *tables = next;
        for state in &aggregate.states {
            self.sequence.observe(state.id);
        }
        Ok(())
    }

    /// Returns the committed board row, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the table lock is poisoned.
    pub fn board(&self, board_id: BoardId) -> StoreResult<Option<Board>> {
        let tables = self.tables.read().map_err(lock_error)?;
        Ok(tables.boards.get(&board_id).cloned())
    }

    /// Returns every committed row belonging to `board_id` as an aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the table lock is poisoned.
    pub fn aggregate(&self, board_id: BoardId) -> StoreResult<Option<BoardAggregate>> {
        let tables = self.tables.read().map_err(lock_error)?;
        let Some(board) = tables.boards.get(&board_id).cloned() else {
            return Ok(None);
        };
        Ok(Some(BoardAggregate {
            board,
            states: rows_of_board::<State>(&tables, board_id),
            tasks: rows_of_board::<Task>(&tables, board_id),
            comments: rows_of_board::<Comment>(&tables, board_id),
            members: rows_of_board::<BoardMember>(&tables, board_id),
        }))
    }

    /// Returns the total number of committed rows across all tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the table lock is poisoned.
    pub fn row_count(&self) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(lock_error)?;
        Ok(tables.boards.len()
            + tables.states.len()
            + tables.tasks.len()
            + tables.comments.len()
            + tables.members.len())
    }
}

#[async_trait]
impl ArchivalStore for InMemoryArchivalStore {
    type Session = InMemorySession;

    async fn begin(&self) -> StoreResult<Self::Session> {
        let working = self.tables.read().map_err(lock_error)?.clone();
        Ok(InMemorySession {
            shared: Arc::clone(&self.tables),
            sequence: Arc::clone(&self.sequence),
            working,
            journal: Vec::new(),
            staged: ChangeSet::default(),
            staged_states: Vec::new(),
            closed: false,
        })
    }
}

/// Unit of work over an [`InMemoryArchivalStore`].
#[derive(Debug)]
pub struct InMemorySession {
    shared: Arc<RwLock<Tables>>,
    sequence: Arc<StateSequence>,
    working: Tables,
    journal: Vec<ChangeSet>,
    staged: ChangeSet,
    staged_states: Vec<NewState>,
    closed: bool,
}

impl InMemorySession {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn flush_staged(&mut self) -> StoreResult<()> {
        let mut changes = std::mem::take(&mut self.staged);
        for draft in std::mem::take(&mut self.staged_states) {
            changes.states.inserts.push(draft.with_id(self.sequence.next()));
        }
        if changes.is_empty() {
            return Ok(());
        }

        let mut next = self.working.clone();
        if let Err(err) = changes.apply_to(&mut next) {
            self.closed = true;
            return Err(err);
        }
        self.working = next;
        self.journal.push(changes);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemorySession {
    async fn flush(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.flush_staged()
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.flush_staged()?;
        self.closed = true;

        let mut shared = self.shared.write().map_err(lock_error)?;
        let mut next = shared.clone();
        for changes in &self.journal {
            changes.apply_to(&mut next)?;
        }
        *shared = next;
        Ok(())
    }
}

/// Table access for entities held by the in-memory store.
trait MemoryEntity: Entity {
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self>;
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self>;
    fn changes_mut(changes: &mut ChangeSet) -> &mut Changes<Self>;
    fn belongs_to(&self, tables: &Tables, board_id: BoardId) -> bool;
}

impl MemoryEntity for Board {
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self> {
        &tables.boards
    }
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self> {
        &mut tables.boards
    }
    fn changes_mut(changes: &mut ChangeSet) -> &mut Changes<Self> {
        &mut changes.boards
    }
    fn belongs_to(&self, _tables: &Tables, board_id: BoardId) -> bool {
        self.id() == board_id
    }
}

impl MemoryEntity for State {
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self> {
        &tables.states
    }
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self> {
        &mut tables.states
    }
    fn changes_mut(changes: &mut ChangeSet) -> &mut Changes<Self> {
        &mut changes.states
    }
    fn belongs_to(&self, _tables: &Tables, board_id: BoardId) -> bool {
        self.board_id == board_id
    }
}

impl MemoryEntity for Task {
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self> {
        &tables.tasks
    }
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self> {
        &mut tables.tasks
    }
    fn changes_mut(changes: &mut ChangeSet) -> &mut Changes<Self> {
        &mut changes.tasks
    }
    fn belongs_to(&self, _tables: &Tables, board_id: BoardId) -> bool {
        self.board_id == board_id
    }
}

impl MemoryEntity for Comment {
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self> {
        &tables.comments
    }
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self> {
        &mut tables.comments
    }
    fn changes_mut(changes: &mut ChangeSet) -> &mut Changes<Self> {
        &mut changes.comments
    }
    fn belongs_to(&self, tables: &Tables, board_id: BoardId) -> bool {
        tables
            .tasks
            .get(&self.task_id)
            .is_some_and(|task| task.board_id == board_id)
    }
}

impl MemoryEntity for BoardMember {
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self> {
        &tables.members
    }
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self> {
        &mut tables.members
    }
    fn changes_mut(changes: &mut ChangeSet) -> &mut Changes<Self> {
        &mut changes.members
    }
    fn belongs_to(&self, _tables: &Tables, board_id: BoardId) -> bool {
        self.board_id == board_id
    }
}

fn rows_of_board<E: MemoryEntity>(tables: &Tables, board_id: BoardId) -> Vec<E> {
    E::table(tables)
        .values()
        .filter(|row| row.belongs_to(tables, board_id))
        .cloned()
        .collect()
}

/// Writes for one entity kind, with keys already resolved.
#[derive(Debug, Clone)]
struct Changes<E: Entity> {
    removes: Vec<E::Key>,
    updates: Vec<E>,
    inserts: Vec<E>,
}

impl<E: Entity> Default for Changes<E> {
    fn default() -> Self {
        Self {
            removes: Vec::new(),
            updates: Vec::new(),
            inserts: Vec::new(),
        }
    }
}

impl<E: MemoryEntity> Changes<E> {
    fn is_empty(&self) -> bool {
        self.removes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }

    fn apply_removes(&self, tables: &mut Tables) -> StoreResult<()> {
        let table = E::table_mut(tables);
        for key in &self.removes {
            if table.remove(key).is_none() {
                return Err(StoreError::not_found::<E>(key));
            }
        }
        Ok(())
    }

    fn apply_upserts(&self, tables: &mut Tables) -> StoreResult<()> {
        let table = E::table_mut(tables);
        for row in &self.updates {
            let slot = table
                .get_mut(&row.key())
                .ok_or_else(|| StoreError::not_found::<E>(&row.key()))?;
            *slot = row.clone();
        }
        for row in &self.inserts {
            let key = row.key();
            if table.contains_key(&key) {
                return Err(StoreError::duplicate::<E>(&key));
            }
            table.insert(key, row.clone());
        }
        Ok(())
    }
}

/// One flushed batch across every entity kind.
#[derive(Debug, Clone, Default)]
struct ChangeSet {
    boards: Changes<Board>,
    states: Changes<State>,
    tasks: Changes<Task>,
    comments: Changes<Comment>,
    members: Changes<BoardMember>,
}

impl ChangeSet {
    fn is_empty(&self) -> bool {
        self.boards.is_empty()
            && self.states.is_empty()
            && self.tasks.is_empty()
            && self.comments.is_empty()
            && self.members.is_empty()
    }

    fn apply_to(&self, tables: &mut Tables) -> StoreResult<()> {
        self.comments.apply_removes(tables)?;
        self.tasks.apply_removes(tables)?;
        self.states.apply_removes(tables)?;
        self.members.apply_removes(tables)?;
        self.boards.apply_removes(tables)?;

        self.boards.apply_upserts(tables)?;
        self.states.apply_upserts(tables)?;
        self.tasks.apply_upserts(tables)?;
        self.comments.apply_upserts(tables)?;
        self.members.apply_upserts(tables)?;

        check_constraints(tables)
    }
}

fn check_constraints(tables: &Tables) -> StoreResult<()> {
    let mut names = HashSet::new();
    let mut orders = HashSet::new();
    for state in tables.states.values() {
        if !tables.boards.contains_key(&state.board_id) {
            return Err(violation(format!(
                "state {} references missing board {}",
                state.id, state.board_id
            )));
        }
        if !names.insert((state.board_id, state.name.as_str())) {
            return Err(violation(format!(
                "duplicate state name '{}' on board {}",
                state.name, state.board_id
            )));
        }
        if !orders.insert((state.board_id, state.order)) {
            return Err(violation(format!(
                "duplicate state order {} on board {}",
                state.order, state.board_id
            )));
        }
    }

    for task in tables.tasks.values() {
        if !tables.boards.contains_key(&task.board_id) {
            return Err(violation(format!(
                "task {} references missing board {}",
                task.id, task.board_id
            )));
        }
        if !tables.states.contains_key(&task.state_id) {
            return Err(violation(format!(
                "task {} references missing state {}",
                task.id, task.state_id
            )));
        }
    }

    if let Some(comment) = tables
        .comments
        .values()
        .find(|comment| !tables.tasks.contains_key(&comment.task_id))
    {
        return Err(violation(format!(
            "comment {} references missing task {}",
            comment.id, comment.task_id
        )));
    }

    if let Some(member) = tables
        .members
        .values()
        .find(|member| !tables.boards.contains_key(&member.board_id))
    {
        return Err(violation(format!(
            "member {} references missing board {}",
            member.user_id, member.board_id
        )));
    }

    Ok(())
}

fn violation(message: String) -> StoreError {
    StoreError::ConstraintViolation(message)
}

fn read_row<E: MemoryEntity>(tables: &Tables, key: &E::Key) -> Option<E> {
    E::table(tables).get(key).cloned()
}

macro_rules! memory_repository {
    ($entity:ty) => {
        #[async_trait]
        impl Repository<$entity> for InMemorySession {
            async fn get(
                &mut self,
                key: &<$entity as Entity>::Key,
            ) -> StoreResult<Option<$entity>> {
                self.ensure_open()?;
                Ok(read_row::<$entity>(&self.working, key))
            }

            async fn find_by_board(&mut self, board_id: BoardId) -> StoreResult<Vec<$entity>> {
                self.ensure_open()?;
                Ok(rows_of_board::<$entity>(&self.working, board_id))
            }

            fn add(&mut self, draft: <$entity as Entity>::Draft) {
                <$entity as StageInsert>::stage(self, draft);
            }

            fn update(&mut self, entity: $entity) {
                <$entity as MemoryEntity>::changes_mut(&mut self.staged)
                    .updates
                    .push(entity);
            }

            fn remove(&mut self, key: <$entity as Entity>::Key) {
                <$entity as MemoryEntity>::changes_mut(&mut self.staged)
                    .removes
                    .push(key);
            }
        }
    };
}

/// Routes a draft to the staged inserts of its entity kind.
trait StageInsert: Entity {
    fn stage(session: &mut InMemorySession, draft: Self::Draft);
}

impl StageInsert for State {
    fn stage(session: &mut InMemorySession, draft: NewState) {
        session.staged_states.push(draft);
    }
}

macro_rules! stage_self_insert {
    ($($entity:ty),+) => {
        $(
            impl StageInsert for $entity {
                fn stage(session: &mut InMemorySession, draft: Self) {
                    Self::changes_mut(&mut session.staged).inserts.push(draft);
                }
            }
        )+
    };
}

stage_self_insert!(Board, Task, Comment, BoardMember);

memory_repository!(Board);
memory_repository!(State);
memory_repository!(Task);
memory_repository!(Comment);
memory_repository!(BoardMember);
