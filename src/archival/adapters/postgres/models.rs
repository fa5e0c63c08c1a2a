//! Diesel row models for board archival persistence.

use super::schema::{archival_jobs, board_members, boards, comments, states, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::archival::domain::{
    Board, BoardId, BoardMember, Comment, CommentId, NewState, PersistedBoardData, State, StateId,
    Task, TaskId, UserId,
};

/// Board row, used for reads, inserts and full-row updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = boards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct BoardRow {
    /// Stable board identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Owning user.
    pub owner_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Archived flag.
    pub is_archived: bool,
    /// Archival timestamp.
    pub archived_at: Option<DateTime<Utc>>,
    /// Archival reason.
    pub archival_reason: Option<String>,
}

impl From<&Board> for BoardRow {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id().into_inner(),
            name: board.name().to_owned(),
            description: board.description().map(str::to_owned),
            owner_id: board.owner_id().into_inner(),
            created_at: board.created_at(),
            updated_at: board.updated_at(),
            is_archived: board.is_archived(),
            archived_at: board.archived_at(),
            archival_reason: board.archival_reason().map(str::to_owned),
        }
    }
}

impl From<BoardRow> for Board {
    fn from(row: BoardRow) -> Self {
        Self::from_persisted(PersistedBoardData {
            id: BoardId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            owner_id: UserId::from_uuid(row.owner_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived: row.is_archived,
            archived_at: row.archived_at,
            archival_reason: row.archival_reason,
        })
    }
}

/// State row as read from the store.
#[derive(Debug, Clone, Queryable, Selectable, AsChangeset)]
#[diesel(table_name = states)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StateRow {
    /// Serial surrogate key.
    pub id: i32,
    /// Owning board.
    pub board_id: uuid::Uuid,
    /// Column name.
    pub name: String,
    /// Column rank.
    pub sort_order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&State> for StateRow {
    fn from(state: &State) -> Self {
        Self {
            id: state.id.value(),
            board_id: state.board_id.into_inner(),
            name: state.name.clone(),
            sort_order: state.order,
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

impl From<StateRow> for State {
    fn from(row: StateRow) -> Self {
        Self {
            id: StateId::new(row.id),
            board_id: BoardId::from_uuid(row.board_id),
            name: row.name,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert model for states; the key comes from the serial sequence.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = states)]
pub struct NewStateRow {
    /// Owning board.
    pub board_id: uuid::Uuid,
    /// Column name.
    pub name: String,
    /// Column rank.
    pub sort_order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&NewState> for NewStateRow {
    fn from(state: &NewState) -> Self {
        Self {
            board_id: state.board_id.into_inner(),
            name: state.name.clone(),
            sort_order: state.order,
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// Task row, used for reads, inserts and full-row updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TaskRow {
    /// Stable task identifier.
    pub id: uuid::Uuid,
    /// Owning board.
    pub board_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Workflow state.
    pub state_id: i32,
    /// Optional assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.into_inner(),
            board_id: task.board_id.into_inner(),
            title: task.title.clone(),
            description: task.description.clone(),
            state_id: task.state_id.value(),
            assignee_id: task.assignee_id.map(UserId::into_inner),
            created_at: task.created_at,
            updated_at: task.updated_at,
            due_date: task.due_date,
        }
    }
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: TaskId::from_uuid(row.id),
            board_id: BoardId::from_uuid(row.board_id),
            title: row.title,
            description: row.description,
            state_id: StateId::new(row.state_id),
            assignee_id: row.assignee_id.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
            due_date: row.due_date,
        }
    }
}

/// Comment row, used for reads, inserts and full-row updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentRow {
    /// Stable comment identifier.
    pub id: uuid::Uuid,
    /// Parent task.
    pub task_id: uuid::Uuid,
    /// Comment author.
    pub author_id: uuid::Uuid,
    /// Comment body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&Comment> for CommentRow {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.into_inner(),
            task_id: comment.task_id.into_inner(),
            author_id: comment.author_id.into_inner(),
            content: comment.content.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::from_uuid(row.id),
            task_id: TaskId::from_uuid(row.task_id),
            author_id: UserId::from_uuid(row.author_id),
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Membership row, used for reads, inserts and full-row updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = board_members)]
#[diesel(primary_key(board_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BoardMemberRow {
    /// Board the membership grants access to.
    pub board_id: uuid::Uuid,
    /// Member user.
    pub user_id: uuid::Uuid,
    /// Role on the board.
    pub role: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&BoardMember> for BoardMemberRow {
    fn from(member: &BoardMember) -> Self {
        Self {
            board_id: member.board_id.into_inner(),
            user_id: member.user_id.into_inner(),
            role: member.role.clone(),
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl From<BoardMemberRow> for BoardMember {
    fn from(row: BoardMemberRow) -> Self {
        Self {
            board_id: BoardId::from_uuid(row.board_id),
            user_id: UserId::from_uuid(row.user_id),
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Archival job row, used for reads and upserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = archival_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ArchivalJobRow {
    /// Job identifier.
    pub id: uuid::Uuid,
    /// Target board.
    pub board_id: uuid::Uuid,
    /// Requested operation.
    pub job_type: String,
    /// Current status.
    pub status: String,
    /// Acceptance timestamp.
    pub started_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Snapshot blob written or consumed.
    pub blob_path: Option<String>,
    /// Failure description.
    pub error_message: Option<String>,
    /// Worker that processed the job.
    pub processed_by: Option<String>,
    /// Free-form metadata.
    pub metadata: Option<String>,
}
