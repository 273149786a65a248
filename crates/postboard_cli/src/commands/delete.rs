//! Delete-post command implementation.

use super::index::IndexedBoard;
use super::CliResult;
use postboard_core::{EntityId, Post};
use std::path::Path;
use tracing::info;

/// Deletes a post and drops it from the index.
pub fn delete_post(path: &Path, id: i64) -> CliResult<()> {
    let board = IndexedBoard::open(path)?;
    let db = &board.db;
    db.transaction(|txn| db.table::<Post>().delete(txn, EntityId::new(id)))?;
    board.save()?;
    Ok(())
}

/// Runs the delete-post command.
pub fn run(path: &Path, id: i64) -> CliResult<()> {
    info!("Deleting post {} from {:?}", id, path);
    delete_post(path, id)?;
    println!("Deleted post {id}");
    Ok(())
}
