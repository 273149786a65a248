//! Job positions.

use crate::database::Database;
use crate::entity::{EntityId, Record};
use crate::error::CoreResult;
use crate::model::{ensure_named, User};
use serde::{Deserialize, Serialize};

/// A user's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(skip)]
    id: Option<EntityId>,
    /// Position name, unique by convention.
    pub name: String,
}

impl Position {
    /// Default position names.
    pub const DEFAULT_NAMES: [&'static str; 4] =
        ["Front-end", "Back-end", "Full-stack", "Product Manager"];

    /// Creates an unsaved position.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Inserts any of [`DEFAULT_NAMES`](Self::DEFAULT_NAMES) that are
    /// missing. Returns the number inserted.
    pub fn insert_positions(db: &Database) -> CoreResult<usize> {
        ensure_named(
            db,
            &Self::DEFAULT_NAMES,
            |p: &Position| p.name.as_str(),
            |name| Position::new(name),
        )
    }

    /// Finds a position by name.
    pub fn find_by_name(db: &Database, name: &str) -> CoreResult<Option<Position>> {
        db.table::<Position>().find_first(|p| p.name == name)
    }

    /// Returns the users holding this position.
    pub fn members(&self, db: &Database) -> CoreResult<Vec<User>> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        db.table::<User>().filter(|u| u.position_id == Some(id))
    }
}

impl Record for Position {
    const TABLE: &'static str = "position";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
