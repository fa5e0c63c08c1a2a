//! Shared fixtures for archival unit tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

use crate::archival::{
    adapters::memory::{InMemoryArchivalStore, InMemoryBlobStore},
    domain::{
        ArchivalJob, Board, BoardAggregate, BoardId, BoardMember, Comment, CommentId, JobId,
        JobStatus, PersistedBoardData, State, StateId, Task, TaskId, UserId,
    },
    ports::{BlobStore, BlobStoreResult, JobStatusRepository, JobStatusResult},
    services::{ArchiveService, RestoreService},
};

mockall::mock! {
    pub Blobs {}

    #[async_trait::async_trait]
    impl BlobStore for Blobs {
        async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> BlobStoreResult<()>;
        async fn download(&self, name: &str) -> BlobStoreResult<Vec<u8>>;
        async fn list(&self, prefix: &str) -> BlobStoreResult<Vec<String>>;
        async fn delete(&self, name: &str) -> BlobStoreResult<()>;
        async fn exists(&self, name: &str) -> BlobStoreResult<bool>;
    }
}

mockall::mock! {
    pub Jobs {}

    #[async_trait::async_trait]
    impl JobStatusRepository for Jobs {
        async fn upsert(&self, job: &ArchivalJob) -> JobStatusResult<()>;
        async fn get(&self, id: JobId) -> JobStatusResult<Option<ArchivalJob>>;
        async fn update_status(
            &self,
            id: JobId,
            status: JobStatus,
            error_message: Option<String>,
        ) -> JobStatusResult<()>;
        async fn list_for_board(&self, board_id: BoardId) -> JobStatusResult<Vec<ArchivalJob>>;
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().expect("clock lock");
        *now += delta;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

/// The "Sprint 1" board: Todo/0 and Done/1, one task in Todo with one
/// comment, and one member. State keys are deliberately non-contiguous.
pub struct SprintBoard {
    pub aggregate: BoardAggregate,
    pub todo: StateId,
    pub done: StateId,
    pub task_id: TaskId,
    pub comment_id: CommentId,
    pub member_id: UserId,
}

impl SprintBoard {
    pub fn board_id(&self) -> BoardId {
        self.aggregate.board.id()
    }
}

#[fixture]
pub fn sprint_board() -> SprintBoard {
    let board_id = BoardId::new();
    let owner = UserId::new();
    let board = Board::from_persisted(PersistedBoardData {
        id: board_id,
        name: "Sprint 1".to_owned(),
        description: Some("Two week sprint".to_owned()),
        owner_id: owner,
        created_at: ts(9, 0),
        updated_at: ts(9, 5),
        archived: false,
        archived_at: None,
        archival_reason: None,
    });
    let todo = state(board_id, 41, "Todo", 0);
    let done = state(board_id, 57, "Done", 1);
    let task = Task {
        id: TaskId::new(),
        board_id,
        title: "Write release notes".to_owned(),
        description: None,
        state_id: todo.id,
        assignee_id: Some(owner),
        created_at: ts(10, 0),
        updated_at: ts(10, 30),
        due_date: Some(ts(17, 0)),
    };
    let comment = Comment {
        id: CommentId::new(),
        task_id: task.id,
        author_id: owner,
        content: "Draft is in the wiki".to_owned(),
        created_at: ts(11, 0),
        updated_at: ts(11, 0),
    };
    let member = BoardMember {
        board_id,
        user_id: UserId::new(),
        role: "editor".to_owned(),
        created_at: ts(9, 10),
        updated_at: ts(9, 10),
    };

    SprintBoard {
        todo: todo.id,
        done: done.id,
        task_id: task.id,
        comment_id: comment.id,
        member_id: member.user_id,
        aggregate: BoardAggregate {
            board,
            states: vec![todo, done],
            tasks: vec![task],
            comments: vec![comment],
            members: vec![member],
        },
    }
}

pub fn state(board_id: BoardId, id: i32, name: &str, order: i32) -> State {
    State {
        id: StateId::new(id),
        board_id,
        name: name.to_owned(),
        order,
        created_at: ts(9, 1),
        updated_at: ts(9, 2),
    }
}

pub type MemoryArchive = ArchiveService<InMemoryArchivalStore, InMemoryBlobStore, TestClock>;
pub type MemoryRestore = RestoreService<InMemoryArchivalStore, InMemoryBlobStore>;

/// Engines wired to one in-memory store and blob store.
pub struct Harness {
    pub store: Arc<InMemoryArchivalStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub clock: Arc<TestClock>,
    pub archive: MemoryArchive,
    pub restore: MemoryRestore,
}

#[fixture]
pub fn harness() -> Harness {
    let store = Arc::new(InMemoryArchivalStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let clock = Arc::new(TestClock::at(ts(12, 0)));
    Harness {
        archive: ArchiveService::new(Arc::clone(&store), Arc::clone(&blobs), Arc::clone(&clock)),
        restore: RestoreService::new(Arc::clone(&store), Arc::clone(&blobs)),
        store,
        blobs,
        clock,
    }
}

impl Harness {
    pub fn seeded(self, board: &SprintBoard) -> Self {
        self.store
            .seed(&board.aggregate)
            .expect("seeding should succeed");
        self
    }
}
