//! Teams.

use crate::database::Database;
use crate::entity::{EntityId, Record};
use crate::error::CoreResult;
use crate::model::{ensure_named, Post, User};
use serde::{Deserialize, Serialize};

/// A group of users sharing a post feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(skip)]
    id: Option<EntityId>,
    /// Team name, unique by convention.
    pub name: String,
}

impl Team {
    /// Default team names.
    pub const DEFAULT_NAMES: [&'static str; 3] = ["team1", "team2", "team3"];

    /// Creates an unsaved team.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Inserts any of [`DEFAULT_NAMES`](Self::DEFAULT_NAMES) that are
    /// missing. Returns the number inserted.
    pub fn insert_teams(db: &Database) -> CoreResult<usize> {
        ensure_named(db, &Self::DEFAULT_NAMES, |t: &Team| t.name.as_str(), |name| {
            Team::new(name)
        })
    }

    /// Finds a team by name.
    pub fn find_by_name(db: &Database, name: &str) -> CoreResult<Option<Team>> {
        db.table::<Team>().find_first(|t| t.name == name)
    }

    /// Returns the team's members.
    pub fn members(&self, db: &Database) -> CoreResult<Vec<User>> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        db.table::<User>().filter(|u| u.team_id == Some(id))
    }

    /// Returns the team's posts, newest first.
    pub fn posts(&self, db: &Database) -> CoreResult<Vec<Post>> {
        match self.id {
            Some(id) => Post::for_team(db, id),
            None => Ok(Vec::new()),
        }
    }
}

impl Record for Team {
    const TABLE: &'static str = "teams";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_teams_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(Team::insert_teams(&db).unwrap(), 3);
        assert_eq!(Team::insert_teams(&db).unwrap(), 0);

        let names: Vec<_> = db
            .table::<Team>()
            .scan_all()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["team1", "team2", "team3"]);
    }

    #[test]
    fn insert_teams_fills_gaps() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|txn| db.table::<Team>().insert(txn, &mut Team::new("team2")))
            .unwrap();
        assert_eq!(Team::insert_teams(&db).unwrap(), 2);
        assert_eq!(db.table::<Team>().count(), 3);
    }

    #[test]
    fn insert_teams_is_one_commit() {
        let db = Database::open_in_memory().unwrap();
        Team::insert_teams(&db).unwrap();
        assert_eq!(db.committed_seq().as_u64(), 1);
    }

    #[test]
    fn find_by_name() {
        let db = Database::open_in_memory().unwrap();
        Team::insert_teams(&db).unwrap();
        let team = Team::find_by_name(&db, "team2").unwrap().unwrap();
        assert_eq!(team.id(), Some(EntityId::new(2)));
        assert!(Team::find_by_name(&db, "team9").unwrap().is_none());
    }

    #[test]
    fn unsaved_team_has_no_members() {
        let db = Database::open_in_memory().unwrap();
        assert!(Team::new("x").members(&db).unwrap().is_empty());
        assert!(Team::new("x").posts(&db).unwrap().is_empty());
    }
}
