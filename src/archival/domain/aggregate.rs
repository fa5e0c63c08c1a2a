//! In-memory view of a board and everything it owns.

use super::{Board, BoardMember, Comment, State, Task, TaskId};
use std::collections::HashSet;

/// A board together with its states, tasks, comments and members, read as
/// one point-in-time view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardAggregate {
    /// Aggregate root.
    pub board: Board,
    /// Workflow states in store order.
    pub states: Vec<State>,
    /// Tasks on the board.
    pub tasks: Vec<Task>,
    /// Comments on the board's tasks.
    pub comments: Vec<Comment>,
    /// Board memberships.
    pub members: Vec<BoardMember>,
}

impl BoardAggregate {
    /// Returns the comments attached to `task_id`, in load order.
    pub fn comments_for(&self, task_id: TaskId) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .filter(move |comment| comment.task_id == task_id)
    }

    /// Returns `true` when every task points at a state of this board and
    /// every comment points at a task of this board.
    #[must_use]
    pub fn references_are_closed(&self) -> bool {
        let state_ids: HashSet<_> = self.states.iter().map(|state| state.id).collect();
        let task_ids: HashSet<_> = self.tasks.iter().map(|task| task.id).collect();
        let board_id = self.board.id();

        self.states.iter().all(|state| state.board_id == board_id)
            && self
                .tasks
                .iter()
                .all(|task| task.board_id == board_id && state_ids.contains(&task.state_id))
            && self
                .comments
                .iter()
                .all(|comment| task_ids.contains(&comment.task_id))
            && self.members.iter().all(|member| member.board_id == board_id)
    }

    /// Returns the number of child rows owned by the board.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.states.len() + self.tasks.len() + self.comments.len() + self.members.len()
    }
}
