//! Portable snapshot document written to cold storage.
//!
//! The document mirrors the aggregate one-to-one. States keep their original
//! surrogate key so tasks can be re-pointed after the store assigns new keys.
//! Required fields are never defaulted on decode: a missing array or scalar
//! is a decode error.

use super::{
    BoardAggregate, BoardFields, BoardId, BoardMember, Comment, CommentId, NewState, State,
    StateId, StateMatchKey, Task, TaskId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one board aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    /// Stable board identifier.
    pub board_id: BoardId,
    /// Board display name.
    pub name: String,
    /// Optional board description.
    pub description: Option<String>,
    /// Owning user.
    pub owner_id: UserId,
    /// Board creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Board last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Reason recorded when the board was archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archival_reason: Option<String>,
    /// Workflow states in store order.
    pub states: Vec<StateSnapshot>,
    /// Tasks with their comments nested.
    pub tasks: Vec<TaskSnapshot>,
    /// Board memberships.
    pub members: Vec<MemberSnapshot>,
}

/// Snapshot of a workflow state, including its original surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Surrogate key the state had when it was archived.
    pub id: StateId,
    /// Column name.
    pub name: String,
    /// Column rank.
    pub order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a task and its comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    /// Stable task identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Original surrogate key of the task's state.
    pub state_id: StateId,
    /// Optional assignee.
    pub assignee_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Comments on the task.
    pub comments: Vec<CommentSnapshot>,
}

/// Snapshot of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnapshot {
    /// Stable comment identifier.
    pub id: CommentId,
    /// Comment author.
    pub author_id: UserId,
    /// Comment body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a board membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    /// Member user.
    pub user_id: UserId,
    /// Role on the board.
    pub role: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BoardSnapshot {
    /// Projects an aggregate into its snapshot document.
    ///
    /// Field order is board fields, states, tasks (each carrying its own
    /// comments), then members.
    #[must_use]
    pub fn from_aggregate(aggregate: &BoardAggregate) -> Self {
        let board = &aggregate.board;
        Self {
            board_id: board.id(),
            name: board.name().to_owned(),
            description: board.description().map(str::to_owned),
            owner_id: board.owner_id(),
            created_at: board.created_at(),
            updated_at: board.updated_at(),
            archival_reason: board.archival_reason().map(str::to_owned),
            states: aggregate.states.iter().map(StateSnapshot::from).collect(),
            tasks: aggregate
                .tasks
                .iter()
                .map(|task| TaskSnapshot::from_task(task, aggregate.comments_for(task.id)))
                .collect(),
            members: aggregate.members.iter().map(MemberSnapshot::from).collect(),
        }
    }

    /// Returns the mutable board fields carried by the snapshot.
    #[must_use]
    pub fn board_fields(&self) -> BoardFields {
        BoardFields {
            name: self.name.clone(),
            description: self.description.clone(),
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            archival_reason: self.archival_reason.clone(),
        }
    }

    /// Returns the total number of comments across all tasks.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.tasks.iter().map(|task| task.comments.len()).sum()
    }
}

impl From<&State> for StateSnapshot {
    fn from(state: &State) -> Self {
        Self {
            id: state.id,
            name: state.name.clone(),
            order: state.order,
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

impl StateSnapshot {
    /// Returns the attribute tuple used to find this state after it has been
    /// recreated under a new key.
    #[must_use]
    pub fn match_key(&self) -> StateMatchKey {
        StateMatchKey::new(&self.name, self.order, self.created_at, self.updated_at)
    }

    /// Builds the insert for this state on `board_id`, without a key.
    #[must_use]
    pub fn to_new_state(&self, board_id: BoardId) -> NewState {
        NewState {
            board_id,
            name: self.name.clone(),
            order: self.order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl TaskSnapshot {
    fn from_task<'a>(task: &Task, comments: impl Iterator<Item = &'a Comment>) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            state_id: task.state_id,
            assignee_id: task.assignee_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
            due_date: task.due_date,
            comments: comments.map(CommentSnapshot::from).collect(),
        }
    }

    /// Rebuilds the task on `board_id`, pointing at `state_id`.
    #[must_use]
    pub fn to_task(&self, board_id: BoardId, state_id: StateId) -> Task {
        Task {
            id: self.id,
            board_id,
            title: self.title.clone(),
            description: self.description.clone(),
            state_id,
            assignee_id: self.assignee_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            due_date: self.due_date,
        }
    }
}

impl From<&Comment> for CommentSnapshot {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl CommentSnapshot {
    /// Rebuilds the comment under `task_id`.
    #[must_use]
    pub fn to_comment(&self, task_id: TaskId) -> Comment {
        Comment {
            id: self.id,
            task_id,
            author_id: self.author_id,
            content: self.content.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<&BoardMember> for MemberSnapshot {
    fn from(member: &BoardMember) -> Self {
        Self {
            user_id: member.user_id,
            role: member.role.clone(),
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl MemberSnapshot {
    /// Rebuilds the membership on `board_id`.
    #[must_use]
    pub fn to_member(&self, board_id: BoardId) -> BoardMember {
        BoardMember {
            board_id,
            user_id: self.user_id,
            role: self.role.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
