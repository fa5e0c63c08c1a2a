//! Entities owned by a board: workflow states, tasks, comments and members.

use super::{BoardId, CommentId, StateId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow column of a board, keyed by a store-assigned integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Store-assigned surrogate key.
    pub id: StateId,
    /// Owning board.
    pub board_id: BoardId,
    /// Column name, unique within the board.
    pub name: String,
    /// Column rank, unique within the board.
    pub order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A state awaiting insertion; the store assigns its key on flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewState {
    /// Owning board.
    pub board_id: BoardId,
    /// Column name, unique within the board.
    pub name: String,
    /// Column rank, unique within the board.
    pub order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl NewState {
    /// Attaches a store-assigned key, producing the persisted state.
    #[must_use]
    pub fn with_id(self, id: StateId) -> State {
        State {
            id,
            board_id: self.board_id,
            name: self.name,
            order: self.order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Unit of work on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task identifier.
    pub id: TaskId,
    /// Owning board.
    pub board_id: BoardId,
    /// Task title.
    pub title: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Workflow state the task sits in.
    pub state_id: StateId,
    /// Optional assignee.
    pub assignee_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
}

/// Comment left on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Stable comment identifier.
    pub id: CommentId,
    /// Task the comment belongs to.
    pub task_id: TaskId,
    /// Comment author.
    pub author_id: UserId,
    /// Comment body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Membership of a user on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMember {
    /// Board the membership grants access to.
    pub board_id: BoardId,
    /// Member user.
    pub user_id: UserId,
    /// Role of the member on the board.
    pub role: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
