//! Inbound messages driven through [`ArchivalDispatcher`].
//!
//! [`ArchivalDispatcher`]: board_archival::archival::services::ArchivalDispatcher

use crate::in_memory::helpers::{
    FixedClock, MemoryStack, committed_aggregate, fixture_time, seed_sprint_board, stack,
};
use board_archival::archival::{
    domain::{BoardId, JobKind, JobStatus},
    ports::JobStatusRepository,
    services::DispatchOutcome,
};
use rstest::rstest;

/// An archive message followed by a dearchive message leaves two completed
/// job records that point at the same snapshot.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn archive_then_dearchive_messages_complete_two_jobs(
    stack: eyre::Result<MemoryStack>,
) -> eyre::Result<()> {
    let stack = stack?;
    let seeded = seed_sprint_board(&*stack.store).await?;
    let finished = fixture_time(13, 0)?;
    let dispatcher = stack
        .dispatcher(FixedClock(finished))
        .with_worker_id("integration-worker");

    let archived = dispatcher
        .handle_raw(&format!(
            r#"{{"boardId":"{}","boardName":"Sprint 1","jobType":"BoardArchival"}}"#,
            seeded.board_id
        ))
        .await?;
    let restored = dispatcher
        .handle_raw(&format!(
            r#"{{"boardId":"{}","jobType":"dearchive"}}"#,
            seeded.board_id
        ))
        .await?;

    let (DispatchOutcome::Archived(archive_receipt), DispatchOutcome::Restored(restore_receipt)) =
        (archived, restored)
    else {
        return Err(eyre::eyre!("unexpected dispatch outcomes"));
    };
    assert_eq!(archive_receipt.location, restore_receipt.location);

    let jobs = stack.jobs.list_for_board(seeded.board_id).await?;
    let kinds: Vec<_> = jobs.iter().map(|job| (job.job_type, job.status)).collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&(JobKind::Archive, JobStatus::Completed)));
    assert!(kinds.contains(&(JobKind::Dearchive, JobStatus::Completed)));
    let blob_name = archive_receipt.location.name();
    for job in &jobs {
        assert_eq!(job.blob_path.as_deref(), Some(blob_name.as_str()));
        assert_eq!(job.processed_by.as_deref(), Some("integration-worker"));
        assert_eq!(job.completed_at, Some(finished));
    }

    let live = committed_aggregate(&*stack.store, seeded.board_id).await?;
    assert!(!live.board.is_archived());
    assert_eq!(live.child_count(), 5);
    Ok(())
}

/// A message for an unknown board fails and leaves a failed job record.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn archive_of_missing_board_records_failed_job(
    stack: eyre::Result<MemoryStack>,
) -> eyre::Result<()> {
    let stack = stack?;
    let dispatcher = stack.dispatcher(FixedClock::noon()?);
    let board_id = BoardId::new();

    let result = dispatcher
        .handle_raw(&format!(r#"{{"boardId":"{board_id}","jobType":"archive"}}"#))
        .await;

    assert!(result.is_err());
    let jobs = stack.jobs.list_for_board(board_id).await?;
    assert_eq!(
        jobs.iter().map(|job| job.status).collect::<Vec<_>>(),
        vec![JobStatus::Failed]
    );
    assert!(
        jobs.first()
            .and_then(|job| job.error_message.as_deref())
            .is_some_and(|message| message.contains(&board_id.to_string()))
    );
    Ok(())
}
