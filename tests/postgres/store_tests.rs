//! Unit of work and engine tests against `PostgreSQL`.

use std::sync::Arc;

use crate::postgres::helpers::{
    FixedClock, committed_aggregate, fixture_time, provision_schema, seed_sprint_board,
};
use board_archival::archival::{
    adapters::memory::InMemoryBlobStore,
    domain::{NewState, State, Task},
    ports::{ArchivalStore, BlobStore, Repository, StoreError, UnitOfWork},
    services::{ArchiveService, RestoreService},
};

#[tokio::test(flavor = "multi_thread")]
async fn seeded_board_loads_with_store_assigned_state_keys() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let store = schema.store();

    let seeded = seed_sprint_board(&store).await?;
    let loaded = committed_aggregate(&store, seeded.board_id).await?;

    assert_eq!(loaded.board.name(), "Sprint 1");
    assert_eq!(loaded.board.description(), Some("Two week sprint"));
    assert_eq!(
        loaded
            .states
            .iter()
            .map(|state| (state.id, state.name.as_str(), state.order))
            .collect::<Vec<_>>(),
        vec![(seeded.todo, "Todo", 0), (seeded.done, "Done", 1)]
    );
    assert_eq!(
        loaded.tasks.first().map(|task| (task.id, task.state_id)),
        Some((seeded.task_id, seeded.todo))
    );
    assert_eq!(
        loaded.tasks.first().and_then(|task| task.due_date),
        Some(fixture_time(17, 0)?)
    );
    assert_eq!(loaded.comments.len(), 1);
    assert_eq!(loaded.members.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_unit_of_work_rolls_back_flushed_writes() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let store = schema.store();
    let seeded = seed_sprint_board(&store).await?;

    {
        let mut session = store.begin().await?;
        Repository::<Task>::remove(&mut session, seeded.task_id);
        session.flush().await?;
        let remaining = Repository::<Task>::find_by_board(&mut session, seeded.board_id).await?;
        assert!(remaining.is_empty(), "flushed delete is visible in session");
    }

    let committed = committed_aggregate(&store, seeded.board_id).await?;
    assert_eq!(committed.tasks.len(), 1);
    assert_eq!(committed.comments.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_state_order_is_a_constraint_violation() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let store = schema.store();
    let seeded = seed_sprint_board(&store).await?;
    let stamp = fixture_time(12, 0)?;

    let mut session = store.begin().await?;
    Repository::<State>::add(
        &mut session,
        NewState {
            board_id: seeded.board_id,
            name: "Also first".to_owned(),
            order: 0,
            created_at: stamp,
            updated_at: stamp,
        },
    );
    let result = session.commit().await;

    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn archive_and_dearchive_round_trip_remaps_state_keys() -> eyre::Result<()> {
    let Some(schema) = provision_schema()? else {
        return Ok(());
    };
    let store = Arc::new(schema.store());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let archive = ArchiveService::new(
        Arc::clone(&store),
        Arc::clone(&blobs),
        Arc::new(FixedClock::noon()?),
    );
    let restore = RestoreService::new(Arc::clone(&store), Arc::clone(&blobs));
    let seeded = seed_sprint_board(&*store).await?;
    let original = committed_aggregate(&*store, seeded.board_id).await?;

    let archived = archive.archive(seeded.board_id, Some("sprint closed".to_owned())).await?;
    let cold = committed_aggregate(&*store, seeded.board_id).await?;
    assert!(cold.board.is_archived());
    assert_eq!(cold.board.archived_at(), Some(fixture_time(12, 0)?));
    assert_eq!(cold.child_count(), 0);

    let receipt = restore.dearchive(seeded.board_id).await?;

    assert_eq!(receipt.location, archived.location);
    assert!(!blobs.exists(&archived.location.name()).await?);
    let restored = committed_aggregate(&*store, seeded.board_id).await?;
    assert!(!restored.board.is_archived());
    assert_eq!(restored.board.archival_reason(), Some("sprint closed"));
    assert!(restored.references_are_closed());
    let new_todo = restored
        .states
        .iter()
        .find(|state| state.name == "Todo")
        .ok_or_else(|| eyre::eyre!("Todo was not recreated"))?;
    assert!(new_todo.id > seeded.done, "serial keys keep increasing");
    let task = restored
        .tasks
        .first()
        .ok_or_else(|| eyre::eyre!("task was not recreated"))?;
    let mut expected = original
        .tasks
        .first()
        .cloned()
        .ok_or_else(|| eyre::eyre!("seeded task missing"))?;
    expected.state_id = new_todo.id;
    assert_eq!(*task, expected);
    assert_eq!(restored.comments, original.comments);
    assert_eq!(restored.members, original.members);
    Ok(())
}
