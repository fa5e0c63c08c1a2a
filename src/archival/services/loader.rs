//! Reads a whole board aggregate through one unit of work.

use crate::archival::{
    domain::{Board, BoardAggregate, BoardId, BoardMember, Comment, State, Task},
    ports::{Repository, StoreResult, UnitOfWork, stage_removals},
};

/// Children of one board, as currently stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardChildren {
    /// Workflow states.
    pub states: Vec<State>,
    /// Tasks.
    pub tasks: Vec<Task>,
    /// Comments on the board's tasks.
    pub comments: Vec<Comment>,
    /// Memberships.
    pub members: Vec<BoardMember>,
}

impl BoardChildren {
    /// Returns `true` when the board owns no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.tasks.is_empty()
            && self.comments.is_empty()
            && self.members.is_empty()
    }
}

/// Loads every child row of `board_id`.
///
/// # Errors
///
/// Returns the store error of the first failing read.
pub async fn load_children<U>(session: &mut U, board_id: BoardId) -> StoreResult<BoardChildren>
where
    U: UnitOfWork + ?Sized,
{
    let states = Repository::<State>::find_by_board(session, board_id).await?;
    let tasks = Repository::<Task>::find_by_board(session, board_id).await?;
    let comments = Repository::<Comment>::find_by_board(session, board_id).await?;
    let members = Repository::<BoardMember>::find_by_board(session, board_id).await?;
    Ok(BoardChildren {
        states,
        tasks,
        comments,
        members,
    })
}

/// Loads the board and all of its children, or `None` when the board does
/// not exist.
///
/// # Errors
///
/// Returns the store error of the first failing read.
pub async fn load_aggregate<U>(
    session: &mut U,
    board_id: BoardId,
) -> StoreResult<Option<BoardAggregate>>
where
    U: UnitOfWork + ?Sized,
{
    let Some(board) = Repository::<Board>::get(session, &board_id).await? else {
        return Ok(None);
    };
    let children = load_children(session, board_id).await?;
    Ok(Some(BoardAggregate {
        board,
        states: children.states,
        tasks: children.tasks,
        comments: children.comments,
        members: children.members,
    }))
}

/// Stages deletion of every child row, in dependency order.
pub fn stage_child_removals<U>(session: &mut U, children: &BoardChildren)
where
    U: UnitOfWork + ?Sized,
{
    stage_removals::<Comment, U>(session, &children.comments);
    stage_removals::<Task, U>(session, &children.tasks);
    stage_removals::<State, U>(session, &children.states);
    stage_removals::<BoardMember, U>(session, &children.members);
}
