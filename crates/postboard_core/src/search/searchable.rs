//! The searchable capability and the query path.

use crate::database::Database;
use crate::entity::{EntityId, Record};
use crate::error::{CoreError, CoreResult};
use crate::search::{IndexDocument, SearchIndex};
use std::collections::HashMap;

/// A record type whose rows are mirrored into the search index.
///
/// Implementors should also return [`to_index_document`](Self::to_index_document)
/// from [`Record::index_document`], which is what tags their pending
/// writes for the index synchronizer.
pub trait Searchable: Record {
    /// Names of the indexable fields.
    const SEARCHABLE_FIELDS: &'static [&'static str];

    /// Returns the text of one indexable field.
    fn field_text(&self, field: &str) -> Option<String>;

    /// Builds the index document, or `None` for a row without an id.
    fn to_index_document(&self) -> Option<IndexDocument> {
        let id = self.id()?;
        let document = Self::SEARCHABLE_FIELDS
            .iter()
            .fold(IndexDocument::new(id), |doc, field| {
                match self.field_text(field) {
                    Some(text) => doc.with_field(*field, text),
                    None => doc,
                }
            });
        Some(document)
    }
}

/// One page of search hits, loaded from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults<T> {
    /// Rows in relevance order.
    pub items: Vec<T>,
    /// Total matches reported by the index, across all pages.
    pub total: u64,
}

impl<T> SearchResults<T> {
    /// No hits.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Returns `(items, total)`.
    pub fn into_parts(self) -> (Vec<T>, u64) {
        (self.items, self.total)
    }

    /// Number of rows on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if this page has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Runs a full-text query and loads the matching rows.
///
/// Rows come back in the index's order. Ids the index returns for rows
/// that no longer exist are dropped; `total` is still the index's count.
/// When the index reports no matches the store is not touched.
///
/// # Errors
///
/// `InvalidOperation` if `page` or `per_page` is zero; adapter and
/// decoding errors are propagated.
pub fn search<T: Searchable>(
    db: &Database,
    index: &dyn SearchIndex,
    expression: &str,
    page: usize,
    per_page: usize,
) -> CoreResult<SearchResults<T>> {
    if page == 0 || per_page == 0 {
        return Err(CoreError::invalid_operation(format!(
            "page and per_page must be at least 1 (got page={page}, per_page={per_page})"
        )));
    }

    let hits = index.query_index(T::TABLE, expression, page, per_page)?;
    if hits.total == 0 {
        return Ok(SearchResults::empty());
    }

    let mut by_id: HashMap<EntityId, T> = db
        .table::<T>()
        .get_many(&hits.ids)?
        .into_iter()
        .filter_map(|row| row.id().map(|id| (id, row)))
        .collect();
    let items: Vec<T> = hits.ids.iter().filter_map(|id| by_id.remove(id)).collect();

    if items.len() < hits.ids.len() {
        tracing::debug!(
            table = T::TABLE,
            stale = hits.ids.len() - items.len(),
            "dropped search hits for missing rows"
        );
    }

    Ok(SearchResults {
        items,
        total: hits.total,
    })
}

/// Upserts every row of `T` into the index. Returns the number of rows
/// indexed.
///
/// Entries for rows that no longer exist are left alone.
pub fn reindex<T: Searchable>(db: &Database, index: &dyn SearchIndex) -> CoreResult<usize> {
    let mut indexed = 0;
    for row in db.table::<T>().scan_all()? {
        if let Some(document) = row.to_index_document() {
            index.add_to_index(T::TABLE, &document)?;
            indexed += 1;
        }
    }
    tracing::debug!(table = T::TABLE, indexed, "reindexed table");
    Ok(indexed)
}
