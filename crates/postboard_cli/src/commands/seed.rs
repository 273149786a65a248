//! Seed command implementation.

use super::{open, CliResult};
use postboard_core::{Position, Team};
use std::path::Path;
use tracing::info;

/// Rows inserted by `seed`.
#[derive(Debug, PartialEq, Eq)]
pub struct SeedResult {
    /// Teams inserted.
    pub teams: usize,
    /// Positions inserted.
    pub positions: usize,
}

/// Inserts missing default teams and positions.
pub fn seed(path: &Path) -> CliResult<SeedResult> {
    let db = open(path)?;
    Ok(SeedResult {
        teams: Team::insert_teams(&db)?,
        positions: Position::insert_positions(&db)?,
    })
}

/// Runs the seed command.
pub fn run(path: &Path) -> CliResult<()> {
    info!("Seeding {:?}", path);
    let result = seed(path)?;
    println!(
        "Inserted {} teams and {} positions",
        result.teams, result.positions
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn seeding_twice_inserts_once() {
        let tmp = tempdir().unwrap();
        assert_eq!(
            seed(tmp.path()).unwrap(),
            SeedResult {
                teams: 3,
                positions: 4
            }
        );
        assert_eq!(
            seed(tmp.path()).unwrap(),
            SeedResult {
                teams: 0,
                positions: 0
            }
        );
    }
}
