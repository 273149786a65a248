//! Posts, the searchable record.

use crate::database::Database;
use crate::entity::{EntityId, Record};
use crate::error::CoreResult;
use crate::model::Comment;
use crate::search::{IndexDocument, Searchable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message posted to a team.
///
/// Indexed on `title` and `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(skip)]
    id: Option<EntityId>,
    /// Short title.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Author.
    pub user_id: Option<EntityId>,
    /// Team the post belongs to.
    pub team_id: Option<EntityId>,
}

impl Post {
    /// Creates an unsaved post stamped with the current time.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            timestamp: Utc::now(),
            user_id: None,
            team_id: None,
        }
    }

    /// Sets the author.
    #[must_use]
    pub fn by(mut self, user_id: EntityId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the team.
    #[must_use]
    pub fn in_team(mut self, team_id: EntityId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns the posts of a team, newest first.
    pub fn for_team(db: &Database, team_id: EntityId) -> CoreResult<Vec<Post>> {
        let mut posts = db
            .table::<Post>()
            .filter(|p| p.team_id == Some(team_id))?;
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Returns the comments on this post, oldest first.
    pub fn comments(&self, db: &Database) -> CoreResult<Vec<Comment>> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        let mut comments = db
            .table::<Comment>()
            .filter(|c| c.post_id == Some(id))?;
        comments.sort_by_key(|c| (c.timestamp, c.id()));
        Ok(comments)
    }
}

/// Sorts by timestamp descending, later ids first on ties.
pub(crate) fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl Record for Post {
    const TABLE: &'static str = "posts";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn index_document(&self) -> Option<IndexDocument> {
        self.to_index_document()
    }
}

impl Searchable for Post {
    const SEARCHABLE_FIELDS: &'static [&'static str] = &["title", "description"];

    fn field_text(&self, field: &str) -> Option<String> {
        match field {
            "title" => Some(self.title.clone()),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }
}
