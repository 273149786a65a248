//! Post-commit replay of change sets into the search index.

use crate::changes::ChangeSet;
use crate::config::IndexFailurePolicy;
use crate::entity::EntityId;
use crate::error::CoreResult;
use crate::search::{IndexDocument, SearchIndex};
use crate::transaction::{CommitObserver, Transaction};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum IndexOp {
    Add {
        table: &'static str,
        document: IndexDocument,
    },
    Remove {
        table: &'static str,
        id: EntityId,
    },
}

impl IndexOp {
    fn table(&self) -> &'static str {
        match self {
            Self::Add { table, .. } | Self::Remove { table, .. } => table,
        }
    }

    fn id(&self) -> EntityId {
        match self {
            Self::Add { document, .. } => document.id(),
            Self::Remove { id, .. } => *id,
        }
    }
}

/// Deferred operations keyed by the entry they target.
type DeferredQueue = BTreeMap<(&'static str, EntityId), IndexOp>;

/// Keeps a [`SearchIndex`] in step with committed data.
///
/// Runs as a commit observer after the
/// [`ChangeTracker`](crate::ChangeTracker). On `after_commit` it takes the
/// transaction's change set out of the context and:
///
/// - upserts every created and modified row that carries an index document
/// - removes every deleted row that carries an index document
///
/// Rows without a document are not searchable and are skipped. Nothing is
/// sent to the index for a rolled-back transaction.
///
/// Under [`IndexFailurePolicy::Defer`] at most one operation is queued per
/// `(table, id)`: a newer failure replaces the queued one, and a newer
/// success discards it.
///
/// Created with [`Database::enable_search`](crate::Database::enable_search),
/// which also registers the tracker.
pub struct IndexSynchronizer {
    index: Arc<dyn SearchIndex>,
    policy: IndexFailurePolicy,
    /// Also serializes replay against retry.
    deferred: Mutex<DeferredQueue>,
}

impl IndexSynchronizer {
    pub(crate) fn new(index: Arc<dyn SearchIndex>, policy: IndexFailurePolicy) -> Self {
        Self {
            index,
            policy,
            deferred: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the index being synchronized.
    #[must_use]
    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    /// Returns the failure policy.
    #[must_use]
    pub fn policy(&self) -> IndexFailurePolicy {
        self.policy
    }

    /// Returns the number of index entries waiting for a retry.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Replays the latest deferred operation of each entry.
    ///
    /// Operations that fail again stay queued. Returns how many succeeded.
    pub fn retry_deferred(&self) -> usize {
        let mut deferred = self.deferred.lock();
        let mut replayed = 0;
        deferred.retain(|_, op| match self.apply(op) {
            Ok(()) => {
                replayed += 1;
                false
            }
            Err(e) => {
                tracing::warn!(table = op.table(), id = %op.id(), error = %e, "index retry failed");
                true
            }
        });
        replayed
    }

    fn apply(&self, op: &IndexOp) -> CoreResult<()> {
        match op {
            IndexOp::Add { table, document } => self.index.add_to_index(table, document),
            IndexOp::Remove { table, id } => self.index.remove_from_index(table, *id),
        }
    }

    fn replay(&self, changes: &ChangeSet) -> CoreResult<()> {
        let upserts = changes.created.iter().chain(&changes.modified);
        let adds = upserts.filter_map(|entity| {
            entity.document.as_ref().map(|document| IndexOp::Add {
                table: entity.table,
                document: document.clone(),
            })
        });
        let removes = changes
            .deleted
            .iter()
            .filter(|entity| entity.is_searchable())
            .map(|entity| IndexOp::Remove {
                table: entity.table,
                id: entity.id,
            });
        let ops: Vec<IndexOp> = adds.chain(removes).collect();

        let mut deferred = self.deferred.lock();
        let mut sent = 0usize;
        for (position, op) in ops.iter().enumerate() {
            let key = (op.table(), op.id());
            match self.apply(op) {
                Ok(()) => {
                    deferred.remove(&key);
                    sent += 1;
                }
                Err(e) => match self.policy {
                    IndexFailurePolicy::Propagate => {
                        for skipped in &ops[position + 1..] {
                            tracing::warn!(
                                table = skipped.table(),
                                id = %skipped.id(),
                                "index update skipped after earlier failure"
                            );
                        }
                        return Err(e);
                    }
                    IndexFailurePolicy::Defer => {
                        tracing::warn!(
                            table = op.table(),
                            id = %op.id(),
                            error = %e,
                            "deferring index update"
                        );
                        deferred.insert(key, op.clone());
                    }
                },
            }
        }
        if sent > 0 {
            tracing::debug!(sent, "replayed changes into search index");
        }
        Ok(())
    }
}

impl CommitObserver for IndexSynchronizer {
    fn after_commit(&self, txn: &mut Transaction) -> CoreResult<()> {
        match txn.context_mut().take_changes() {
            Some(changes) => self.replay(&changes),
            None => Ok(()),
        }
    }

    fn after_rollback(&self, txn: &mut Transaction) {
        txn.context_mut().take_changes();
    }
}

impl std::fmt::Debug for IndexSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSynchronizer")
            .field("policy", &self.policy)
            .field("deferred", &self.deferred_count())
            .finish_non_exhaustive()
    }
}
