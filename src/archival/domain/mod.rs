//! Domain model for board archival.
//!
//! The board aggregate, its snapshot document, blob naming, and the state key
//! remapping all live here, free of storage concerns.

mod aggregate;
mod board;
mod children;
mod error;
mod ids;
mod job;
mod location;
mod message;
mod remap;
mod snapshot;

pub use aggregate::BoardAggregate;
pub use board::{Board, BoardFields, PersistedBoardData};
pub use children::{BoardMember, Comment, NewState, State, Task};
pub use error::{ArchivalDomainError, ParseJobStatusError};
pub use ids::{BoardId, CommentId, JobId, StateId, TaskId, UserId};
pub use job::{ArchivalJob, JobStatus};
pub use location::{
    DEFAULT_SNAPSHOT_PREFIX, SNAPSHOT_CONTENT_TYPE, SNAPSHOT_EXTENSION, SnapshotLocation,
};
pub use message::{ArchivalMessage, JobKind};
pub use remap::{StateKeyMap, StateMatchKey};
pub use snapshot::{BoardSnapshot, CommentSnapshot, MemberSnapshot, StateSnapshot, TaskSnapshot};
