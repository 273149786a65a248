//! Users and password hashing.

use crate::database::Database;
use crate::entity::{EntityId, Record};
use crate::error::{CoreError, CoreResult};
use crate::model::post::newest_first;
use crate::model::Post;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

const SALT_LEN: usize = 16;

/// A board member.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip)]
    id: Option<EntityId>,
    /// Login name, unique by convention.
    pub username: String,
    /// Email address, unique by convention.
    pub email: String,
    /// Argon2 hash in PHC string format.
    pub password_hash: Option<String>,
    /// Position held.
    pub position_id: Option<EntityId>,
    /// Free-form profile text.
    pub about_me: Option<String>,
    /// Last activity.
    pub last_seen: DateTime<Utc>,
    /// Team membership.
    pub team_id: Option<EntityId>,
}

impl User {
    /// Creates an unsaved user with no password.
    #[must_use]
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
            password_hash: None,
            position_id: None,
            about_me: None,
            last_seen: Utc::now(),
            team_id: None,
        }
    }

    /// Hashes and stores a password.
    pub fn set_password(&mut self, password: &str) -> CoreResult<()> {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let salt =
            SaltString::encode_b64(&salt).map_err(|e| CoreError::password_hash(e.to_string()))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CoreError::password_hash(e.to_string()))?;
        self.password_hash = Some(hash.to_string());
        Ok(())
    }

    /// Checks a password against the stored hash.
    ///
    /// False when no password is set or the stored hash is unreadable.
    #[must_use]
    pub fn check_password(&self, password: &str) -> bool {
        let Some(stored) = self.password_hash.as_deref() else {
            return false;
        };
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::debug!(user = %self.username, error = %e, "unreadable password hash");
                false
            }
        }
    }

    /// Sets `last_seen` to now.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Returns the posts of the user's team, newest first.
    ///
    /// A user without a team sees nothing.
    pub fn team_posts(&self, db: &Database) -> CoreResult<Vec<Post>> {
        match self.team_id {
            Some(team_id) => Post::for_team(db, team_id),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the posts this user wrote, newest first.
    pub fn posts(&self, db: &Database) -> CoreResult<Vec<Post>> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        let mut posts = db.table::<Post>().filter(|p| p.user_id == Some(id))?;
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Finds a user by username.
    pub fn find_by_username(db: &Database, username: &str) -> CoreResult<Option<User>> {
        db.table::<User>().find_first(|u| u.username == username)
    }
}

// Keeps the hash out of logs.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("team_id", &self.team_id)
            .field("position_id", &self.position_id)
            .finish_non_exhaustive()
    }
}

impl Record for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

/// Loads the user behind a session id.
///
/// Session ids arrive as strings; one that is not an integer names no
/// user.
pub fn load_user(db: &Database, user_id: &str) -> CoreResult<Option<User>> {
    match user_id.trim().parse::<i64>() {
        Ok(id) => db.table::<User>().get(EntityId::new(id)),
        Err(_) => Ok(None),
    }
}
