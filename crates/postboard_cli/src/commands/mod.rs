//! CLI command implementations.

pub mod add;
pub mod delete;
pub mod index;
pub mod search;
pub mod seed;
pub mod stats;

use postboard_core::Database;
use std::path::Path;

/// Error type shared by the commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Opens the database at `path`, creating it if missing.
pub fn open(path: &Path) -> CliResult<Database> {
    Ok(Database::open(path)?)
}
