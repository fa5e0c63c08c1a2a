//! Time budget for the part of a run that precedes its commit.

use std::future::Future;
use std::time::Duration;

use super::error::{ArchivalError, ArchivalResult};
use crate::archival::domain::BoardId;

/// Awaits `work`, giving up after `limit` when one is set.
///
/// Expiry drops `work` together with any unit of work it holds, so only
/// steps that come before a commit may run under a limit.
pub(super) async fn before_deadline<T>(
    board_id: BoardId,
    limit: Option<Duration>,
    work: impl Future<Output = ArchivalResult<T>>,
) -> ArchivalResult<T> {
    let Some(budget) = limit else {
        return work.await;
    };
    tokio::time::timeout(budget, work).await.unwrap_or_else(|_| {
        tracing::error!(
            %board_id,
            limit = ?budget,
            "archival run exceeded its deadline before commit"
        );
        Err(ArchivalError::DeadlineExceeded {
            board_id,
            limit: budget,
        })
    })
}
