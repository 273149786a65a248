//! Search index adapter boundary.

use crate::entity::EntityId;
use crate::error::CoreResult;
use crate::search::IndexDocument;

/// Ranked ids returned by a search index query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHits {
    /// Ids of the requested page, most relevant first.
    pub ids: Vec<EntityId>,
    /// Number of matches across all pages.
    pub total: u64,
}

impl QueryHits {
    /// Creates a result.
    #[must_use]
    pub fn new(ids: Vec<EntityId>, total: u64) -> Self {
        Self { ids, total }
    }

    /// A result with no matches.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// An external text search index.
///
/// Entries are keyed by `(table, id)`. The index is the authority on
/// ranking; the primary store is the authority on which rows exist.
///
/// Implementations map their own failures to
/// [`CoreError::SearchIndex`](crate::CoreError::SearchIndex). Retry and
/// backoff, if any, belong inside the implementation.
pub trait SearchIndex: Send + Sync {
    /// Inserts or replaces the entry for `document.id()`.
    ///
    /// Must be idempotent.
    fn add_to_index(&self, table: &str, document: &IndexDocument) -> CoreResult<()>;

    /// Deletes the entry for `id`. Deleting a missing entry is a no-op.
    fn remove_from_index(&self, table: &str, id: EntityId) -> CoreResult<()>;

    /// Returns one page of ids matching `expression`, most relevant first,
    /// and the total number of matches.
    ///
    /// `page` is 1-based. Both `page` and `per_page` are at least 1.
    fn query_index(
        &self,
        table: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> CoreResult<QueryHits>;
}
