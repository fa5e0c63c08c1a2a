//! When steps for board archival BDD scenarios.

use super::world::{ArchivalWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the board is archived")]
fn archive_board(world: &mut ArchivalWorld) -> Result<(), eyre::Report> {
    let board_id = world.seeded()?.board_id;
    let receipt =
        run_async(world.archive.archive(board_id, None)).wrap_err("archive scenario board")?;
    world.last_archive = Some(receipt);
    Ok(())
}

#[when("the board is dearchived")]
fn dearchive_board(world: &mut ArchivalWorld) -> Result<(), eyre::Report> {
    let board_id = world.seeded()?.board_id;
    world.last_restore = Some(run_async(world.restore.dearchive(board_id)));
    Ok(())
}

#[when(r#"a message with job type "{job_type}" is dispatched for the board"#)]
fn dispatch_message(world: &mut ArchivalWorld, job_type: String) -> Result<(), eyre::Report> {
    let board_id = world.seeded()?.board_id;
    let raw = serde_json::json!({ "boardId": board_id, "jobType": job_type }).to_string();
    world.last_dispatch = Some(run_async(world.dispatcher.handle_raw(&raw)));
    Ok(())
}
