//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases and the
//! board used throughout the tests: four users, one post each.

use crate::recording::RecordingIndex;
use chrono::{DateTime, Duration, Utc};
use postboard_core::{Config, Database, EntityId, Post, User};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory().expect("Failed to open in-memory database"),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test database.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-based test database with a configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_with_config(temp_dir.path(), config)
            .expect("Failed to open file database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Creates an in-memory database with search enabled on a
    /// [`RecordingIndex`].
    pub fn with_recording_index() -> (Self, Arc<RecordingIndex>) {
        Self::with_recording_index_config(Config::default())
    }

    /// Like [`with_recording_index`](Self::with_recording_index) with a
    /// configuration.
    pub fn with_recording_index_config(config: Config) -> (Self, Arc<RecordingIndex>) {
        let db = Database::open_with_backend(
            config,
            Box::new(postboard_storage::InMemoryBackend::new()),
        )
        .expect("Failed to open in-memory database");
        let index = Arc::new(RecordingIndex::new());
        db.enable_search(index.clone())
            .expect("Failed to enable search");
        (Self { db, temp_dir: None }, index)
    }

    /// Returns the database directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the database, releasing its lock. Returns the directory of
    /// a file database.
    pub fn close(self) -> Option<TempDir> {
        drop(self.db);
        self.temp_dir
    }

    /// Closes the database and reopens it from the same directory.
    ///
    /// Panics for in-memory databases.
    pub fn reopen(self) -> Self {
        let config = self.db.config().clone();
        let temp_dir = self
            .close()
            .expect("Only file databases can be reopened");
        let db = Database::open_with_config(temp_dir.path(), config)
            .expect("Failed to reopen database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, path)
}

/// Inserts a post in its own transaction and returns its id.
pub fn insert_post(db: &Database, title: &str, description: &str) -> EntityId {
    db.transaction(|txn| {
        db.table::<Post>()
            .insert(txn, &mut Post::new(title, description))
    })
    .expect("Failed to insert post")
}

/// Replaces a post's description in its own transaction.
pub fn update_post_description(db: &Database, id: EntityId, description: &str) {
    let posts = db.table::<Post>();
    let mut post = posts
        .get(id)
        .expect("Failed to load post")
        .expect("Post should exist");
    post.description = description.to_string();
    db.transaction(|txn| posts.update(txn, &post))
        .expect("Failed to update post");
}

/// Deletes a post in its own transaction.
pub fn delete_post(db: &Database, id: EntityId) {
    db.transaction(|txn| db.table::<Post>().delete(txn, id))
        .expect("Failed to delete post");
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Usernames of the sample board, in insertion order.
    pub const USERNAMES: [&str; 4] = ["john", "susan", "mary", "david"];

    /// Seconds after `now` at which each user posted.
    pub const POST_OFFSETS: [i64; 4] = [1, 4, 3, 2];

    /// Inserts four users, each with one post titled "help", in one
    /// transaction. Returns the post ids in user order.
    pub fn sample_board(db: &Database, now: DateTime<Utc>) -> Vec<EntityId> {
        db.transaction(|txn| {
            let mut post_ids = Vec::new();
            for (name, offset) in USERNAMES.iter().zip(POST_OFFSETS) {
                let mut user = User::new(*name, format!("{name}@example.com"));
                let user_id = db.table::<User>().insert(txn, &mut user)?;
                let mut post = Post::new("help", format!("post from {name}"))
                    .by(user_id)
                    .at(now + Duration::seconds(offset));
                post_ids.push(db.table::<Post>().insert(txn, &mut post)?);
            }
            Ok(post_ids)
        })
        .expect("Failed to insert sample board")
    }
}
