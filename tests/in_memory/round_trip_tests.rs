//! Archive and dearchive round trips through the public engine API.

use crate::in_memory::helpers::{MemoryStack, committed_aggregate, seed_sprint_board, stack};
use board_archival::archival::{
    domain::SnapshotLocation,
    ports::BlobStore,
    services::{ArchivalErrorKind, decode_snapshot},
};
use rstest::rstest;

/// Archiving "Sprint 1" leaves one blob and the bare board row; dearchiving
/// rebuilds it under fresh state keys and removes the blob.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sprint_board_survives_a_round_trip(stack: eyre::Result<MemoryStack>) -> eyre::Result<()> {
    let stack = stack?;
    let seeded = seed_sprint_board(&*stack.store).await?;
    let original = committed_aggregate(&*stack.store, seeded.board_id).await?;

    let archived = stack.archive.archive(seeded.board_id, None).await?;

    let blob_names = stack.blobs.list("archivals/").await?;
    assert_eq!(blob_names, vec![archived.location.name()]);
    let parsed = SnapshotLocation::parse("archivals", &archived.location.name())?;
    assert_eq!(parsed.board_id(), seeded.board_id);
    let snapshot = decode_snapshot(&stack.blobs.download(&archived.location.name()).await?)?;
    assert_eq!(
        (
            snapshot.states.len(),
            snapshot.tasks.len(),
            snapshot.comment_count(),
            snapshot.members.len()
        ),
        (2, 1, 1, 1)
    );
    let cold = committed_aggregate(&*stack.store, seeded.board_id).await?;
    assert!(cold.board.is_archived());
    assert_eq!(cold.child_count(), 0);
    assert_eq!(stack.store.row_count()?, 1);

    let restored_receipt = stack.restore.dearchive(seeded.board_id).await?;

    assert!(restored_receipt.reclaimed);
    assert!(stack.blobs.list("archivals/").await?.is_empty());
    let restored = committed_aggregate(&*stack.store, seeded.board_id).await?;
    assert!(!restored.board.is_archived());
    assert_eq!(restored.board.fields(), original.board.fields());
    assert!(restored.references_are_closed());

    let new_todo = restored
        .states
        .iter()
        .find(|state| state.name == "Todo" && state.order == 0)
        .ok_or_else(|| eyre::eyre!("Todo was not recreated"))?;
    assert!(
        restored
            .states
            .iter()
            .all(|state| state.id != seeded.todo && state.id != seeded.done),
        "states receive fresh keys"
    );
    let task = restored
        .tasks
        .first()
        .ok_or_else(|| eyre::eyre!("task was not recreated"))?;
    assert_eq!(task.id, seeded.task_id);
    assert_eq!(task.state_id, new_todo.id);
    assert_eq!(
        restored.comments.first().map(|comment| (comment.id, comment.task_id)),
        Some((seeded.comment_id, seeded.task_id))
    );
    assert_eq!(
        restored.members.first().map(|member| member.user_id),
        Some(seeded.member_id)
    );
    Ok(())
}

/// The board can be archived again after a restore, and the second restore
/// reads the newer snapshot.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn board_cycles_through_two_archivals(stack: eyre::Result<MemoryStack>) -> eyre::Result<()> {
    let stack = stack?;
    let seeded = seed_sprint_board(&*stack.store).await?;

    stack.archive.archive(seeded.board_id, None).await?;
    stack.restore.dearchive(seeded.board_id).await?;
    let second = stack
        .archive
        .archive(seeded.board_id, Some("quarter closed".to_owned()))
        .await?;
    let receipt = stack.restore.dearchive(seeded.board_id).await?;

    assert_eq!(receipt.location, second.location);
    assert_eq!((receipt.states, receipt.tasks), (2, 1));
    let restored = committed_aggregate(&*stack.store, seeded.board_id).await?;
    assert_eq!(restored.board.archival_reason(), Some("quarter closed"));
    Ok(())
}

/// Dearchiving a board that was never archived reports a missing snapshot.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dearchive_without_archive_has_no_snapshot(
    stack: eyre::Result<MemoryStack>,
) -> eyre::Result<()> {
    let stack = stack?;
    let seeded = seed_sprint_board(&*stack.store).await?;

    let err = stack
        .restore
        .dearchive(seeded.board_id)
        .await
        .err()
        .ok_or_else(|| eyre::eyre!("dearchive should fail"))?;

    assert_eq!(err.kind(), ArchivalErrorKind::NoSnapshot);
    let live = committed_aggregate(&*stack.store, seeded.board_id).await?;
    assert_eq!(live.child_count(), 5);
    Ok(())
}
