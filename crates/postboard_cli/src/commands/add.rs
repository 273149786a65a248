//! Add-user and add-post command implementations.

use super::index::IndexedBoard;
use super::{open, CliResult};
use postboard_core::{EntityId, Position, Post, Record, Team, User};
use std::path::Path;
use tracing::info;

/// Arguments of `add-user`.
#[derive(Debug)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Team name.
    pub team: Option<String>,
    /// Position name.
    pub position: Option<String>,
}

/// Creates a user. Returns the new id.
pub fn add_user(path: &Path, new_user: &NewUser) -> CliResult<EntityId> {
    let db = open(path)?;
    if User::find_by_username(&db, &new_user.username)?.is_some() {
        return Err(format!("user {:?} already exists", new_user.username).into());
    }

    let mut user = User::new(&new_user.username, &new_user.email);
    user.set_password(&new_user.password)?;
    if let Some(name) = &new_user.team {
        let team = Team::find_by_name(&db, name)?
            .ok_or_else(|| format!("no team named {name:?}; run seed first"))?;
        user.team_id = team.id();
    }
    if let Some(name) = &new_user.position {
        let position = Position::find_by_name(&db, name)?
            .ok_or_else(|| format!("no position named {name:?}; run seed first"))?;
        user.position_id = position.id();
    }

    let id = db.transaction(|txn| db.table::<User>().insert(txn, &mut user))?;
    Ok(id)
}

/// Creates a post authored by `username` in the author's team and
/// indexes it. Returns the new id.
pub fn add_post(path: &Path, username: &str, title: &str, description: &str) -> CliResult<EntityId> {
    let board = IndexedBoard::open(path)?;
    let db = &board.db;
    let author = User::find_by_username(&db, username)?
        .ok_or_else(|| format!("no user named {username:?}"))?;

    let mut post = Post::new(title, description);
    post.user_id = author.id();
    post.team_id = author.team_id;

    let id = db.transaction(|txn| db.table::<Post>().insert(txn, &mut post))?;
    board.save()?;
    Ok(id)
}

/// Runs the add-user command.
pub fn run_user(path: &Path, new_user: &NewUser) -> CliResult<()> {
    info!("Adding user {} to {:?}", new_user.username, path);
    let id = add_user(path, new_user)?;
    println!("Created user {} with id {id}", new_user.username);
    Ok(())
}

/// Runs the add-post command.
pub fn run_post(path: &Path, username: &str, title: &str, description: &str) -> CliResult<()> {
    info!("Adding post by {} to {:?}", username, path);
    let id = add_post(path, username, title, description)?;
    println!("Created post {id}");
    Ok(())
}
