//! Job-status persistence tests against `PostgreSQL`.

use crate::postgres::helpers::{FixedClock, fixture_time, provision_schema};
use board_archival::archival::{
    domain::{ArchivalJob, BoardId, JobId, JobKind, JobStatus},
    ports::JobStatusRepository,
};

#[tokio::test(flavor = "multi_thread")]
async fn upsert_inserts_then_replaces_a_job() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let jobs = schema.jobs();
    let board_id = BoardId::new();
    let mut job = ArchivalJob::pending(board_id, JobKind::Archive, &FixedClock::noon()?);
    job.processed_by = Some("pg-worker".to_owned());

    jobs.upsert(&job).await?;
    assert_eq!(jobs.get(job.id).await?, Some(job.clone()));

    job.transition(JobStatus::Completed, &FixedClock(fixture_time(12, 5)?));
    job.blob_path = Some(format!("archivals/{board_id}_20260314120000000.json"));
    job.metadata = Some("sha256=abc".to_owned());
    jobs.upsert(&job).await?;

    assert_eq!(jobs.get(job.id).await?, Some(job));
    assert_eq!(jobs.get(JobId::new()).await?, None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn update_status_sets_status_and_message() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let jobs = schema.jobs();
    let job = ArchivalJob::pending(BoardId::new(), JobKind::Dearchive, &FixedClock::noon()?);
    jobs.upsert(&job).await?;

    jobs.update_status(job.id, JobStatus::Failed, Some("blob store offline".to_owned()))
        .await?;
    jobs.update_status(JobId::new(), JobStatus::Failed, None).await?;

    let stored = jobs
        .get(job.id)
        .await?
        .ok_or_else(|| eyre::eyre!("job disappeared"))?;
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("blob store offline"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn jobs_for_a_board_come_back_oldest_first() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let jobs = schema.jobs();
    let board_id = BoardId::new();
    let later = ArchivalJob::pending(
        board_id,
        JobKind::Dearchive,
        &FixedClock(fixture_time(14, 0)?),
    );
    let earlier = ArchivalJob::pending(
        board_id,
        JobKind::Archive,
        &FixedClock(fixture_time(10, 0)?),
    );
    let unrelated = ArchivalJob::pending(BoardId::new(), JobKind::Archive, &FixedClock::noon()?);
    for job in [&later, &earlier, &unrelated] {
        jobs.upsert(job).await?;
    }

    let listed = jobs.list_for_board(board_id).await?;

    assert_eq!(
        listed.iter().map(|job| job.id).collect::<Vec<_>>(),
        vec![earlier.id, later.id]
    );
    Ok(())
}
