//! `PostgreSQL` relational store with one transaction per unit of work.
//!
//! A unit of work checks one connection out of the pool, opens a transaction
//! on it and keeps both until commit. Each database step moves the connection
//! onto the blocking pool and back. A unit of work dropped before commit
//! returns a connection that is still inside a transaction; the pool treats
//! it as broken and discards it, which rolls the transaction back.

use async_trait::async_trait;
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::models::{BoardMemberRow, BoardRow, CommentRow, NewStateRow, StateRow, TaskRow};
use super::schema::{board_members, boards, comments, states, tasks};
use crate::archival::{
    domain::{Board, BoardId, BoardMember, Comment, State, Task},
    ports::{ArchivalStore, Entity, Repository, StoreError, StoreResult, UnitOfWork},
};

/// `PostgreSQL` connection pool type used by archival adapters.
pub type ArchivalPgPool = Pool<ConnectionManager<PgConnection>>;

type PooledConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Builds a connection pool for `database_url` holding at most `max_size`
/// connections.
///
/// # Errors
///
/// Returns [`StoreError::Persistence`] when the pool cannot be built.
pub fn build_pool(database_url: &str, max_size: u32) -> StoreResult<ArchivalPgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(StoreError::persistence)
}

/// `PostgreSQL`-backed [`ArchivalStore`].
#[derive(Debug, Clone)]
pub struct PostgresArchivalStore {
    pool: ArchivalPgPool,
}

impl PostgresArchivalStore {
    /// Creates a store from a connection pool.
    #[must_use]
    pub const fn new(pool: ArchivalPgPool) -> Self {
        Self { pool }
    }

    /// Returns the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &ArchivalPgPool {
        &self.pool
    }
}

#[async_trait]
impl ArchivalStore for PostgresArchivalStore {
    type Session = PostgresUnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Session> {
        let pool = self.pool.clone();
        let connection = tokio::task::spawn_blocking(move || {
            let mut pooled = pool.get().map_err(StoreError::persistence)?;
            <AnsiTransactionManager as TransactionManager<PgConnection>>::begin_transaction(
                &mut pooled,
            )
            .map_err(StoreError::persistence)?;
            Ok::<_, StoreError>(pooled)
        })
        .await
        .map_err(StoreError::persistence)??;

        Ok(PostgresUnitOfWork {
            connection: Some(connection),
            staged: StagedWrites::default(),
        })
    }
}

/// Unit of work holding one open `PostgreSQL` transaction.
pub struct PostgresUnitOfWork {
    connection: Option<PooledConn>,
    staged: StagedWrites,
}

impl std::fmt::Debug for PostgresUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresUnitOfWork")
            .field("open", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

impl PostgresUnitOfWork {
    /// Runs `f` on the transaction's connection in the blocking pool.
    ///
    /// A failed step leaves the transaction aborted, so the connection is
    /// not handed back and the unit of work is closed.
    async fn with_connection<F, T>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut lent = self.connection.take().ok_or(StoreError::Closed)?;
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let outcome = f(&mut lent);
            (lent, outcome)
        })
        .await
        .map_err(StoreError::persistence)?;
        if result.is_ok() {
            self.connection = Some(returned);
        }
        result
    }

    async fn flush_staged(&mut self) -> StoreResult<()> {
        let writes = std::mem::take(&mut self.staged);
        if writes.is_empty() {
            return if self.connection.is_some() {
                Ok(())
            } else {
                Err(StoreError::Closed)
            };
        }
        self.with_connection(move |connection| writes.execute(connection))
            .await
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn flush(&mut self) -> StoreResult<()> {
        self.flush_staged().await
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.flush_staged().await?;
        self.with_connection(|connection| {
            <AnsiTransactionManager as TransactionManager<PgConnection>>::commit_transaction(
                connection,
            )
            .map_err(map_write_error)
        })
        .await?;
        // Back to the pool outside any transaction.
        self.connection = None;
        Ok(())
    }
}

fn map_write_error(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation,
            info,
        ) => StoreError::ConstraintViolation(info.message().to_owned()),
        other => StoreError::persistence(other),
    }
}

fn expect_one_row<E: Entity>(affected: usize, key: &E::Key) -> StoreResult<()> {
    if affected == 0 {
        return Err(StoreError::not_found::<E>(key));
    }
    Ok(())
}

/// Writes staged for one entity kind.
#[derive(Debug)]
struct Staged<E: Entity> {
    removes: Vec<E::Key>,
    updates: Vec<E>,
    inserts: Vec<E::Draft>,
}

impl<E: Entity> Default for Staged<E> {
    fn default() -> Self {
        Self {
            removes: Vec::new(),
            updates: Vec::new(),
            inserts: Vec::new(),
        }
    }
}

impl<E: PgEntity> Staged<E> {
    fn is_empty(&self) -> bool {
        self.removes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }

    fn execute_removes(&self, connection: &mut PgConnection) -> StoreResult<()> {
        for key in &self.removes {
            let affected = E::delete(connection, key).map_err(map_write_error)?;
            expect_one_row::<E>(affected, key)?;
        }
        Ok(())
    }

    fn execute_upserts(&self, connection: &mut PgConnection) -> StoreResult<()> {
        for row in &self.updates {
            let affected = E::update(connection, row).map_err(map_write_error)?;
            expect_one_row::<E>(affected, &row.key())?;
        }
        if !self.inserts.is_empty() {
            E::insert(connection, &self.inserts).map_err(map_write_error)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StagedWrites {
    boards: Staged<Board>,
    states: Staged<State>,
    tasks: Staged<Task>,
    comments: Staged<Comment>,
    members: Staged<BoardMember>,
}

impl StagedWrites {
    fn is_empty(&self) -> bool {
        self.boards.is_empty()
            && self.states.is_empty()
            && self.tasks.is_empty()
            && self.comments.is_empty()
            && self.members.is_empty()
    }

    fn execute(&self, connection: &mut PgConnection) -> StoreResult<()> {
        self.comments.execute_removes(connection)?;
        self.tasks.execute_removes(connection)?;
        self.states.execute_removes(connection)?;
        self.members.execute_removes(connection)?;
        self.boards.execute_removes(connection)?;

        self.boards.execute_upserts(connection)?;
        self.states.execute_upserts(connection)?;
        self.tasks.execute_upserts(connection)?;
        self.comments.execute_upserts(connection)?;
        self.members.execute_upserts(connection)
    }
}

/// SQL access for entities held in `PostgreSQL`.
trait PgEntity: Entity + Sized {
    fn staged(writes: &mut StagedWrites) -> &mut Staged<Self>;
    fn load(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<Option<Self>>;
    fn load_for_board(connection: &mut PgConnection, board_id: BoardId) -> QueryResult<Vec<Self>>;
    fn delete(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<usize>;
    fn update(connection: &mut PgConnection, row: &Self) -> QueryResult<usize>;
    fn insert(connection: &mut PgConnection, drafts: &[Self::Draft]) -> QueryResult<usize>;
}

impl PgEntity for Board {
    fn staged(writes: &mut StagedWrites) -> &mut Staged<Self> {
        &mut writes.boards
    }

    fn load(connection: &mut PgConnection, key: &BoardId) -> QueryResult<Option<Self>> {
        boards::table
            .find(key.into_inner())
            .select(BoardRow::as_select())
            .first::<BoardRow>(connection)
            .optional()
            .map(|row| row.map(Self::from))
    }

    fn load_for_board(connection: &mut PgConnection, board_id: BoardId) -> QueryResult<Vec<Self>> {
        Ok(Self::load(connection, &board_id)?.into_iter().collect())
    }

    fn delete(connection: &mut PgConnection, key: &BoardId) -> QueryResult<usize> {
        diesel::delete(boards::table.find(key.into_inner())).execute(connection)
    }

    fn update(connection: &mut PgConnection, row: &Self) -> QueryResult<usize> {
        diesel::update(boards::table.find(row.id().into_inner()))
            .set(&BoardRow::from(row))
            .execute(connection)
    }

    fn insert(connection: &mut PgConnection, drafts: &[Self]) -> QueryResult<usize> {
        let rows: Vec<BoardRow> = drafts.iter().map(BoardRow::from).collect();
        diesel::insert_into(boards::table)
            .values(&rows)
            .execute(connection)
    }
}

impl PgEntity for State {
    fn staged(writes: &mut StagedWrites) -> &mut Staged<Self> {
        &mut writes.states
    }

    fn load(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<Option<Self>> {
        states::table
            .find(key.value())
            .select(StateRow::as_select())
            .first::<StateRow>(connection)
            .optional()
            .map(|row| row.map(Self::from))
    }

    fn load_for_board(connection: &mut PgConnection, board_id: BoardId) -> QueryResult<Vec<Self>> {
        let rows = states::table
            .filter(states::board_id.eq(board_id.into_inner()))
            .order(states::id.asc())
            .select(StateRow::as_select())
            .load::<StateRow>(connection)?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    fn delete(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<usize> {
        diesel::delete(states::table.find(key.value())).execute(connection)
    }

    fn update(connection: &mut PgConnection, row: &Self) -> QueryResult<usize> {
        diesel::update(states::table.find(row.id.value()))
            .set(&StateRow::from(row))
            .execute(connection)
    }

    fn insert(connection: &mut PgConnection, drafts: &[Self::Draft]) -> QueryResult<usize> {
        let rows: Vec<NewStateRow> = drafts.iter().map(NewStateRow::from).collect();
        diesel::insert_into(states::table)
            .values(&rows)
            .execute(connection)
    }
}

impl PgEntity for Task {
    fn staged(writes: &mut StagedWrites) -> &mut Staged<Self> {
        &mut writes.tasks
    }

    fn load(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<Option<Self>> {
        tasks::table
            .find(key.into_inner())
            .select(TaskRow::as_select())
            .first::<TaskRow>(connection)
            .optional()
            .map(|row| row.map(Self::from))
    }

    fn load_for_board(connection: &mut PgConnection, board_id: BoardId) -> QueryResult<Vec<Self>> {
        let rows = tasks::table
            .filter(tasks::board_id.eq(board_id.into_inner()))
            .order((tasks::created_at.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .load::<TaskRow>(connection)?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    fn delete(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<usize> {
        diesel::delete(tasks::table.find(key.into_inner())).execute(connection)
    }

    fn update(connection: &mut PgConnection, row: &Self) -> QueryResult<usize> {
        diesel::update(tasks::table.find(row.id.into_inner()))
            .set(&TaskRow::from(row))
            .execute(connection)
    }

    fn insert(connection: &mut PgConnection, drafts: &[Self]) -> QueryResult<usize> {
        let rows: Vec<TaskRow> = drafts.iter().map(TaskRow::from).collect();
        diesel::insert_into(tasks::table)
            .values(&rows)
            .execute(connection)
    }
}

impl PgEntity for Comment {
    fn staged(writes: &mut StagedWrites) -> &mut Staged<Self> {
        &mut writes.comments
    }

    fn load(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<Option<Self>> {
        comments::table
            .find(key.into_inner())
            .select(CommentRow::as_select())
            .first::<CommentRow>(connection)
            .optional()
            .map(|row| row.map(Self::from))
    }

    fn load_for_board(connection: &mut PgConnection, board_id: BoardId) -> QueryResult<Vec<Self>> {
        let board_tasks = tasks::table
            .filter(tasks::board_id.eq(board_id.into_inner()))
            .select(tasks::id);
        let rows = comments::table
            .filter(comments::task_id.eq_any(board_tasks))
            .order((comments::created_at.asc(), comments::id.asc()))
            .select(CommentRow::as_select())
            .load::<CommentRow>(connection)?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    fn delete(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<usize> {
        diesel::delete(comments::table.find(key.into_inner())).execute(connection)
    }

    fn update(connection: &mut PgConnection, row: &Self) -> QueryResult<usize> {
        diesel::update(comments::table.find(row.id.into_inner()))
            .set(&CommentRow::from(row))
            .execute(connection)
    }

    fn insert(connection: &mut PgConnection, drafts: &[Self]) -> QueryResult<usize> {
        let rows: Vec<CommentRow> = drafts.iter().map(CommentRow::from).collect();
        diesel::insert_into(comments::table)
            .values(&rows)
            .execute(connection)
    }
}

impl PgEntity for BoardMember {
    fn staged(writes: &mut StagedWrites) -> &mut Staged<Self> {
        &mut writes.members
    }

    fn load(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<Option<Self>> {
        let (board_id, user_id) = key;
        board_members::table
            .find((board_id.into_inner(), user_id.into_inner()))
            .select(BoardMemberRow::as_select())
            .first::<BoardMemberRow>(connection)
            .optional()
            .map(|row| row.map(Self::from))
    }

    fn load_for_board(connection: &mut PgConnection, board_id: BoardId) -> QueryResult<Vec<Self>> {
        let rows = board_members::table
            .filter(board_members::board_id.eq(board_id.into_inner()))
            .order((board_members::created_at.asc(), board_members::user_id.asc()))
            .select(BoardMemberRow::as_select())
            .load::<BoardMemberRow>(connection)?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    fn delete(connection: &mut PgConnection, key: &Self::Key) -> QueryResult<usize> {
        let (board_id, user_id) = key;
        diesel::delete(board_members::table.find((board_id.into_inner(), user_id.into_inner())))
            .execute(connection)
    }

    fn update(connection: &mut PgConnection, row: &Self) -> QueryResult<usize> {
        diesel::update(
            board_members::table.find((row.board_id.into_inner(), row.user_id.into_inner())),
        )
        .set(&BoardMemberRow::from(row))
        .execute(connection)
    }

    fn insert(connection: &mut PgConnection, drafts: &[Self]) -> QueryResult<usize> {
        let rows: Vec<BoardMemberRow> = drafts.iter().map(BoardMemberRow::from).collect();
        diesel::insert_into(board_members::table)
            .values(&rows)
            .execute(connection)
    }
}

macro_rules! postgres_repository {
    ($entity:ty) => {
        #[async_trait]
        impl Repository<$entity> for PostgresUnitOfWork {
            async fn get(
                &mut self,
                key: &<$entity as Entity>::Key,
            ) -> StoreResult<Option<$entity>> {
                let lookup = key.clone();
                self.with_connection(move |connection| {
                    <$entity as PgEntity>::load(connection, &lookup)
                        .map_err(StoreError::persistence)
                })
                .await
            }

            async fn find_by_board(&mut self, board_id: BoardId) -> StoreResult<Vec<$entity>> {
                self.with_connection(move |connection| {
                    <$entity as PgEntity>::load_for_board(connection, board_id)
                        .map_err(StoreError::persistence)
                })
                .await
            }

            fn add(&mut self, draft: <$entity as Entity>::Draft) {
                <$entity as PgEntity>::staged(&mut self.staged)
                    .inserts
                    .push(draft);
            }

            fn update(&mut self, entity: $entity) {
                <$entity as PgEntity>::staged(&mut self.staged)
                    .updates
                    .push(entity);
            }

            fn remove(&mut self, key: <$entity as Entity>::Key) {
                <$entity as PgEntity>::staged(&mut self.staged)
                    .removes
                    .push(key);
            }
        }
    };
}

postgres_repository!(Board);
postgres_repository!(State);
postgres_repository!(Task);
postgres_repository!(Comment);
postgres_repository!(BoardMember);
