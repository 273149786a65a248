//! Comments on posts.

use crate::entity::{EntityId, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reply to a post. Not searchable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(skip)]
    id: Option<EntityId>,
    /// Comment text.
    pub body: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Author.
    pub author_id: Option<EntityId>,
    /// Post commented on.
    pub post_id: Option<EntityId>,
}

impl Comment {
    /// Creates an unsaved comment stamped with the current time.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            id: None,
            body: body.into(),
            timestamp: Utc::now(),
            author_id: None,
            post_id: None,
        }
    }

    /// Sets the author.
    #[must_use]
    pub fn by(mut self, author_id: EntityId) -> Self {
        self.author_id = Some(author_id);
        self
    }

    /// Sets the post.
    #[must_use]
    pub fn on(mut self, post_id: EntityId) -> Self {
        self.post_id = Some(post_id);
        self
    }
}

impl Record for Comment {
    const TABLE: &'static str = "comments";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
