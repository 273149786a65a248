//! Change tracking for committed transactions.
//!
//! [`ChangeTracker`] snapshots a transaction's pending writes into a
//! [`ChangeSet`] during `before_commit`. The physical commit drains the
//! pending writes, so this is the last moment they can be observed.
//!
//! ```rust,ignore
//! let tracker = Arc::new(ChangeTracker::new());
//! db.add_observer(tracker);
//!
//! // after_commit observers registered later find the set in
//! // txn.context().changes()
//! ```

use crate::entity::EntityId;
use crate::error::CoreResult;
use crate::search::IndexDocument;
use crate::transaction::{CommitObserver, PendingWrite, Transaction};

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Row was created.
    Created,
    /// Row was modified.
    Modified,
    /// Row was deleted.
    Deleted,
}

/// One changed row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    /// Table the row lives in.
    pub table: &'static str,
    /// Row id.
    pub id: EntityId,
    /// Indexable fields, present only for searchable tables.
    pub document: Option<IndexDocument>,
}

impl TrackedEntity {
    /// Checks if the row carries the search capability tag.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        self.document.is_some()
    }
}

/// Created, modified and deleted rows of one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Rows created by the transaction.
    pub created: Vec<TrackedEntity>,
    /// Rows modified by the transaction.
    pub modified: Vec<TrackedEntity>,
    /// Rows deleted by the transaction.
    pub deleted: Vec<TrackedEntity>,
}

impl ChangeSet {
    /// Builds a change set from a transaction's pending writes.
    #[must_use]
    pub fn capture(txn: &Transaction) -> Self {
        let mut changes = Self::default();
        for (&(table, id), write) in txn.pending_writes() {
            let entity = TrackedEntity {
                table,
                id,
                document: write.document().cloned(),
            };
            match write {
                PendingWrite::Insert { .. } => changes.created.push(entity),
                PendingWrite::Update { .. } => changes.modified.push(entity),
                PendingWrite::Delete { .. } => changes.deleted.push(entity),
            }
        }
        changes
    }

    /// Returns the total number of changed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.len() + self.modified.len() + self.deleted.len()
    }

    /// Checks if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every changed row with its kind.
    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, &TrackedEntity)> {
        self.created
            .iter()
            .map(|e| (ChangeKind::Created, e))
            .chain(self.modified.iter().map(|e| (ChangeKind::Modified, e)))
            .chain(self.deleted.iter().map(|e| (ChangeKind::Deleted, e)))
    }
}

/// Captures the change set of every committing transaction.
///
/// Must be registered before any observer that reads the change set.
#[derive(Debug, Default)]
pub struct ChangeTracker;

impl ChangeTracker {
    /// Creates a change tracker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommitObserver for ChangeTracker {
    fn before_commit(&self, txn: &mut Transaction) -> CoreResult<()> {
        let changes = ChangeSet::capture(txn);
        tracing::debug!(
            txid = %txn.id(),
            created = changes.created.len(),
            modified = changes.modified.len(),
            deleted = changes.deleted.len(),
            "captured change set"
        );
        txn.context_mut().attach_changes(changes);
        Ok(())
    }

    fn after_rollback(&self, txn: &mut Transaction) {
        txn.context_mut().clear();
    }
}
