//! Given steps for board archival BDD scenarios.

use super::world::{ArchivalWorld, run_async};
use crate::test_helpers::board::seed_board;
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(
    r#"the live board "{name}" with states Todo and Done, one task, one comment and one member"#
)]
fn live_board(world: &mut ArchivalWorld, name: String) -> Result<(), eyre::Report> {
    let seeded = run_async(seed_board(&*world.store, &name)).wrap_err("seed scenario board")?;
    world.seeded = Some(seeded);
    Ok(())
}

#[given("the board has been archived")]
fn board_has_been_archived(world: &mut ArchivalWorld) -> Result<(), eyre::Report> {
    let board_id = world.seeded()?.board_id;
    let receipt = run_async(world.archive.archive(board_id, None))
        .wrap_err("archive board in scenario setup")?;
    world.last_archive = Some(receipt);
    Ok(())
}
