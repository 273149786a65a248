//! A search index that records its calls.

use parking_lot::Mutex;
use postboard_core::{
    CoreError, CoreResult, EntityId, IndexDocument, InMemorySearchIndex, QueryHits, SearchIndex,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// One call made against a [`RecordingIndex`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexCall {
    /// `add_to_index`.
    Add {
        /// Table.
        table: String,
        /// Document sent.
        document: IndexDocument,
    },
    /// `remove_from_index`.
    Remove {
        /// Table.
        table: String,
        /// Row id.
        id: EntityId,
    },
    /// `query_index`.
    Query {
        /// Table.
        table: String,
        /// Expression.
        expression: String,
        /// Page.
        page: usize,
        /// Page size.
        per_page: usize,
    },
}

/// Wraps an [`InMemorySearchIndex`], logging each call.
///
/// Queries can be answered from a script instead of the real index, and
/// the index can be switched into a failing state.
#[derive(Debug, Default)]
pub struct RecordingIndex {
    inner: InMemorySearchIndex,
    calls: Mutex<Vec<IndexCall>>,
    scripted: Mutex<Option<QueryHits>>,
    failing: AtomicBool,
}

impl RecordingIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every following query with `hits`.
    pub fn script_query(&self, hits: QueryHits) {
        *self.scripted.lock() = Some(hits);
    }

    /// Makes every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the wrapped index.
    pub fn inner(&self) -> &InMemorySearchIndex {
        &self.inner
    }

    /// Returns all calls so far.
    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().clone()
    }

    /// Returns `(table, id)` of every `add_to_index` call.
    pub fn adds(&self) -> Vec<(String, EntityId)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndexCall::Add { table, document } => Some((table, document.id())),
                _ => None,
            })
            .collect()
    }

    /// Returns `(table, id)` of every `remove_from_index` call.
    pub fn removes(&self) -> Vec<(String, EntityId)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndexCall::Remove { table, id } => Some((table, id)),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of `query_index` calls.
    pub fn query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, IndexCall::Query { .. }))
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: IndexCall) -> CoreResult<()> {
        self.calls.lock().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::search_index("recording index set to fail"));
        }
        Ok(())
    }
}

impl SearchIndex for RecordingIndex {
    fn add_to_index(&self, table: &str, document: &IndexDocument) -> CoreResult<()> {
        self.record(IndexCall::Add {
            table: table.to_string(),
            document: document.clone(),
        })?;
        self.inner.add_to_index(table, document)
    }

    fn remove_from_index(&self, table: &str, id: EntityId) -> CoreResult<()> {
        self.record(IndexCall::Remove {
            table: table.to_string(),
            id,
        })?;
        self.inner.remove_from_index(table, id)
    }

    fn query_index(
        &self,
        table: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> CoreResult<QueryHits> {
        self.record(IndexCall::Query {
            table: table.to_string(),
            expression: expression.to_string(),
            page,
            per_page,
        })?;
        if let Some(hits) = self.scripted.lock().clone() {
            return Ok(hits);
        }
        self.inner.query_index(table, expression, page, per_page)
    }
}
