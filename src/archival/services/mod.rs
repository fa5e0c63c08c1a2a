//! Archive, restore and dispatch orchestration.

mod archive;
mod codec;
mod deadline;
mod dispatch;
mod error;
mod loader;
mod restore;

pub use archive::{ArchiveReceipt, ArchiveService};
pub use codec::{EncodedSnapshot, decode_snapshot, digest_hex, encode_snapshot};
pub use dispatch::{ArchivalDispatcher, DEFAULT_WORKER_ID, DispatchOutcome};
pub use error::{ArchivalError, ArchivalErrorKind, ArchivalPhase, ArchivalResult};
pub use loader::{BoardChildren, load_aggregate, load_children, stage_child_removals};
pub use restore::{RestoreReceipt, RestoreService, UnmappedStatePolicy};
