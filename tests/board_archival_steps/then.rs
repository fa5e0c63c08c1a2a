//! Then steps for board archival BDD scenarios.

use super::world::{ArchivalWorld, run_async};
use crate::test_helpers::board::committed_aggregate;
use board_archival::archival::{
    domain::{BoardAggregate, SnapshotLocation},
    ports::{BlobStore, JobStatusRepository},
    services::{ArchivalErrorKind, DispatchOutcome, RestoreReceipt, decode_snapshot},
};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;

fn board_blobs(world: &ArchivalWorld) -> Result<Vec<String>, eyre::Report> {
    let board_id = world.seeded()?.board_id;
    let prefix = SnapshotLocation::board_prefix("archivals", board_id);
    run_async(world.blobs.list(&prefix)).wrap_err("list snapshot blobs")
}

fn stored_aggregate(world: &ArchivalWorld) -> Result<BoardAggregate, eyre::Report> {
    let board_id = world.seeded()?.board_id;
    run_async(committed_aggregate(&*world.store, board_id))
}

fn restore_receipt(world: &ArchivalWorld) -> Result<&RestoreReceipt, eyre::Report> {
    match world.last_restore.as_ref() {
        Some(Ok(receipt)) => Ok(receipt),
        Some(Err(err)) => Err(eyre!("dearchive failed: {err}")),
        None => Err(eyre!("no dearchive was attempted")),
    }
}

#[then("one snapshot blob exists for the board")]
fn one_snapshot_blob(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    let names = board_blobs(world)?;
    let receipt = world
        .last_archive
        .as_ref()
        .ok_or_else(|| eyre!("missing archive receipt"))?;
    if names != vec![receipt.location.name()] {
        return Err(eyre!(
            "expected only {}, found {names:?}",
            receipt.location.name()
        ));
    }
    Ok(())
}

#[then(
    "the snapshot holds {states:usize} states, {tasks:usize} task, {comments:usize} comment and {members:usize} member"
)]
fn snapshot_holds(
    world: &ArchivalWorld,
    states: usize,
    tasks: usize,
    comments: usize,
    members: usize,
) -> Result<(), eyre::Report> {
    let receipt = world
        .last_archive
        .as_ref()
        .ok_or_else(|| eyre!("missing archive receipt"))?;
    let bytes = run_async(world.blobs.download(&receipt.location.name()))
        .wrap_err("download snapshot")?;
    let snapshot = decode_snapshot(&bytes).wrap_err("decode snapshot")?;
    let found = (
        snapshot.states.len(),
        snapshot.tasks.len(),
        snapshot.comment_count(),
        snapshot.members.len(),
    );
    if found != (states, tasks, comments, members) {
        return Err(eyre!(
            "expected ({states}, {tasks}, {comments}, {members}) children, found {found:?}"
        ));
    }
    Ok(())
}

#[then("the store holds only the archived board row")]
fn only_archived_board_row(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    let aggregate = stored_aggregate(world)?;
    let rows = world.store.row_count().wrap_err("count rows")?;
    if !aggregate.board.is_archived() || aggregate.child_count() != 0 || rows != 1 {
        return Err(eyre!(
            "expected one archived board row, found archived={} children={} rows={rows}",
            aggregate.board.is_archived(),
            aggregate.child_count()
        ));
    }
    Ok(())
}

#[then("the board is live again")]
fn board_is_live(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    restore_receipt(world)?;
    let aggregate = stored_aggregate(world)?;
    if aggregate.board.is_archived() || aggregate.board.archived_at().is_some() {
        return Err(eyre!("board is still archived"));
    }
    Ok(())
}

#[then("the store holds {count:usize} states with fresh keys")]
fn states_with_fresh_keys(world: &ArchivalWorld, count: usize) -> Result<(), eyre::Report> {
    let seeded = world.seeded()?;
    let aggregate = stored_aggregate(world)?;
    if aggregate.states.len() != count {
        return Err(eyre!(
            "expected {count} states, found {}",
            aggregate.states.len()
        ));
    }
    if aggregate
        .states
        .iter()
        .any(|state| state.id == seeded.todo || state.id == seeded.done)
    {
        return Err(eyre!("a recreated state kept its archived key"));
    }
    Ok(())
}

#[then(r#"the task is in the recreated state "{name}""#)]
fn task_in_recreated_state(world: &ArchivalWorld, name: String) -> Result<(), eyre::Report> {
    let seeded = world.seeded()?;
    let aggregate = stored_aggregate(world)?;
    let state = aggregate
        .states
        .iter()
        .find(|candidate| candidate.name == name)
        .ok_or_else(|| eyre!("state {name} was not recreated"))?;
    let task = aggregate
        .tasks
        .iter()
        .find(|candidate| candidate.id == seeded.task_id)
        .ok_or_else(|| eyre!("task was not recreated"))?;
    if task.state_id != state.id {
        return Err(eyre!(
            "task references state {}, expected {}",
            task.state_id,
            state.id
        ));
    }
    let receipt = restore_receipt(world)?;
    if receipt.state_id_map.resolve(seeded.todo) != Some(state.id) {
        return Err(eyre!("restore receipt does not map the archived Todo key"));
    }
    Ok(())
}

#[then("the comment is still attached to the task")]
fn comment_attached(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    let seeded = world.seeded()?;
    let aggregate = stored_aggregate(world)?;
    let attached = aggregate
        .comments
        .iter()
        .any(|comment| comment.id == seeded.comment_id && comment.task_id == seeded.task_id);
    if !attached {
        return Err(eyre!("comment was not recreated under its task"));
    }
    Ok(())
}

#[then("no snapshot blob exists for the board")]
fn no_snapshot_blob(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    let names = board_blobs(world)?;
    if !names.is_empty() {
        return Err(eyre!("expected no snapshot blobs, found {names:?}"));
    }
    Ok(())
}

#[then("the operation fails because no snapshot exists")]
fn fails_without_snapshot(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    match world.last_restore.as_ref() {
        Some(Err(err)) if err.kind() == ArchivalErrorKind::NoSnapshot => Ok(()),
        other => Err(eyre!("expected a missing-snapshot failure, got {other:?}")),
    }
}

#[then("the store still holds {count:usize} child rows")]
fn still_holds_children(world: &ArchivalWorld, count: usize) -> Result<(), eyre::Report> {
    let aggregate = stored_aggregate(world)?;
    if aggregate.child_count() != count {
        return Err(eyre!(
            "expected {count} child rows, found {}",
            aggregate.child_count()
        ));
    }
    Ok(())
}

#[then("the message is ignored")]
fn message_ignored(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    match world.last_dispatch.as_ref() {
        Some(Ok(DispatchOutcome::Ignored)) => Ok(()),
        other => Err(eyre!("expected the message to be ignored, got {other:?}")),
    }
}

#[then("no job is recorded for the board")]
fn no_job_recorded(world: &ArchivalWorld) -> Result<(), eyre::Report> {
    let board_id = world.seeded()?.board_id;
    let jobs = run_async(world.jobs.list_for_board(board_id)).wrap_err("list jobs")?;
    if !jobs.is_empty() {
        return Err(eyre!("expected no job records, found {}", jobs.len()));
    }
    Ok(())
}
