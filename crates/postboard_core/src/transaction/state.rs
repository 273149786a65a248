//! Transaction state.

use crate::changes::ChangeSet;
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::search::IndexDocument;
use crate::types::TransactionId;
use std::collections::BTreeMap;

/// `(table, id)` key of a pending write.
pub type WriteKey = (&'static str, EntityId);

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// A write buffered in a transaction.
///
/// `document` is the row's search capability tag: present only for rows
/// of searchable tables.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    /// A row created in this transaction.
    Insert {
        /// Encoded row.
        payload: Vec<u8>,
        /// Indexable fields, if the table is searchable.
        document: Option<IndexDocument>,
    },
    /// An existing row modified in this transaction.
    Update {
        /// Encoded row.
        payload: Vec<u8>,
        /// Indexable fields, if the table is searchable.
        document: Option<IndexDocument>,
    },
    /// An existing row deleted in this transaction.
    Delete {
        /// Indexable fields of the row as it was, if the table is searchable.
        document: Option<IndexDocument>,
    },
}

impl PendingWrite {
    /// Returns the capability tag.
    #[must_use]
    pub fn document(&self) -> Option<&IndexDocument> {
        match self {
            Self::Insert { document, .. }
            | Self::Update { document, .. }
            | Self::Delete { document } => document.as_ref(),
        }
    }
}

/// Per-transaction scratch space shared by commit observers.
///
/// Lives exactly as long as the transaction and is cleared by the manager
/// after the last observer ran.
#[derive(Debug, Default)]
pub struct TransactionContext {
    changes: Option<ChangeSet>,
}

impl TransactionContext {
    /// Stores the captured change set.
    pub fn attach_changes(&mut self, changes: ChangeSet) {
        self.changes = Some(changes);
    }

    /// Returns the captured change set.
    #[must_use]
    pub fn changes(&self) -> Option<&ChangeSet> {
        self.changes.as_ref()
    }

    /// Removes and returns the captured change set.
    pub fn take_changes(&mut self) -> Option<ChangeSet> {
        self.changes.take()
    }

    /// Drops everything in the context.
    pub fn clear(&mut self) {
        self.changes = None;
    }
}

/// A unit of work.
///
/// Writes are buffered until [`TransactionManager::commit`](crate::TransactionManager::commit)
/// and are invisible to other readers until then. Per key, writes fold:
///
/// - insert then update stays an insert with the new payload
/// - insert then delete leaves nothing to write
/// - update then delete becomes a delete
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    writes: BTreeMap<WriteKey, PendingWrite>,
    context: TransactionContext,
}

impl Transaction {
    /// Creates a new transaction.
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            writes: BTreeMap::new(),
            context: TransactionContext::default(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Records a newly created row.
    pub fn insert(
        &mut self,
        table: &'static str,
        id: EntityId,
        payload: Vec<u8>,
        document: Option<IndexDocument>,
    ) -> CoreResult<()> {
        self.ensure_active()?;
        let key = (table, id);
        if self.writes.contains_key(&key) {
            return Err(CoreError::invalid_operation(format!(
                "row {id} of {table} already written in this transaction"
            )));
        }
        self.writes
            .insert(key, PendingWrite::Insert { payload, document });
        Ok(())
    }

    /// Records a modification of a row.
    pub fn update(
        &mut self,
        table: &'static str,
        id: EntityId,
        payload: Vec<u8>,
        document: Option<IndexDocument>,
    ) -> CoreResult<()> {
        self.ensure_active()?;
        let key = (table, id);
        let write = match self.writes.get(&key) {
            Some(PendingWrite::Insert { .. }) => PendingWrite::Insert { payload, document },
            Some(PendingWrite::Delete { .. }) => {
                return Err(CoreError::entity_not_found(table, id.as_i64()));
            }
            Some(PendingWrite::Update { .. }) | None => PendingWrite::Update { payload, document },
        };
        self.writes.insert(key, write);
        Ok(())
    }

    /// Records a deletion of a row.
    pub fn delete(
        &mut self,
        table: &'static str,
        id: EntityId,
        document: Option<IndexDocument>,
    ) -> CoreResult<()> {
        self.ensure_active()?;
        let key = (table, id);
        match self.writes.get(&key) {
            Some(PendingWrite::Insert { .. }) => {
                self.writes.remove(&key);
            }
            Some(PendingWrite::Delete { .. }) => {
                return Err(CoreError::entity_not_found(table, id.as_i64()));
            }
            Some(PendingWrite::Update { .. }) | None => {
                self.writes.insert(key, PendingWrite::Delete { document });
            }
        }
        Ok(())
    }

    /// Gets the pending write for a row.
    #[must_use]
    pub fn pending_write(&self, table: &'static str, id: EntityId) -> Option<&PendingWrite> {
        self.writes.get(&(table, id))
    }

    /// Returns all pending writes, ordered by table then id.
    pub fn pending_writes(&self) -> impl Iterator<Item = (&WriteKey, &PendingWrite)> {
        self.writes.iter()
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Returns the observer context.
    #[must_use]
    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    /// Returns the observer context mutably.
    pub fn context_mut(&mut self) -> &mut TransactionContext {
        &mut self.context
    }

    /// Moves the pending writes out for the physical commit.
    pub(crate) fn take_writes(&mut self) -> BTreeMap<WriteKey, PendingWrite> {
        std::mem::take(&mut self.writes)
    }

    /// Drops the pending writes.
    pub(crate) fn discard_writes(&mut self) {
        self.writes.clear();
    }

    /// Marks the transaction as committed.
    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
    }

    /// Marks the transaction as aborted.
    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(CoreError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTS: &str = "posts";

    fn create_txn() -> Transaction {
        Transaction::new(TransactionId::new(1))
    }

    fn id(n: i64) -> EntityId {
        EntityId::new(n)
    }

    #[test]
    fn new_transaction_is_active() {
        let txn = create_txn();
        assert!(txn.is_active());
        assert_eq!(txn.state(), TransactionState::Active);
        assert!(txn.context().changes().is_none());
    }

    #[test]
    fn insert_records_write() {
        let mut txn = create_txn();
        txn.insert(POSTS, id(1), vec![1, 2, 3], None).unwrap();

        assert_eq!(txn.write_count(), 1);
        assert!(matches!(
            txn.pending_write(POSTS, id(1)),
            Some(PendingWrite::Insert { .. })
        ));
    }

    #[test]
    fn double_insert_rejected() {
        let mut txn = create_txn();
        txn.insert(POSTS, id(1), vec![1], None).unwrap();
        assert!(txn.insert(POSTS, id(1), vec![2], None).is_err());
    }

    #[test]
    fn insert_then_update_stays_insert() {
        let mut txn = create_txn();
        txn.insert(POSTS, id(1), vec![1], None).unwrap();
        txn.update(POSTS, id(1), vec![2], None).unwrap();

        assert_eq!(
            txn.pending_write(POSTS, id(1)),
            Some(&PendingWrite::Insert {
                payload: vec![2],
                document: None
            })
        );
    }

    #[test]
    fn insert_then_delete_leaves_nothing() {
        let mut txn = create_txn();
        txn.insert(POSTS, id(1), vec![1], None).unwrap();
        txn.delete(POSTS, id(1), None).unwrap();
        assert_eq!(txn.write_count(), 0);
    }

    #[test]
    fn update_then_delete_becomes_delete() {
        let mut txn = create_txn();
        txn.update(POSTS, id(1), vec![1], None).unwrap();
        txn.delete(POSTS, id(1), None).unwrap();
        assert!(matches!(
            txn.pending_write(POSTS, id(1)),
            Some(PendingWrite::Delete { .. })
        ));
    }

    #[test]
    fn writes_after_delete_fail() {
        let mut txn = create_txn();
        txn.delete(POSTS, id(1), None).unwrap();
        assert!(matches!(
            txn.update(POSTS, id(1), vec![1], None),
            Err(CoreError::EntityNotFound { .. })
        ));
        assert!(txn.delete(POSTS, id(1), None).is_err());
    }

    #[test]
    fn same_id_in_different_tables_is_distinct() {
        let mut txn = create_txn();
        txn.insert(POSTS, id(1), vec![1], None).unwrap();
        txn.insert("users", id(1), vec![2], None).unwrap();
        assert_eq!(txn.write_count(), 2);
    }

    #[test]
    fn cannot_write_after_commit() {
        let mut txn = create_txn();
        txn.mark_committed();
        assert!(txn.insert(POSTS, id(1), vec![], None).is_err());
    }

    #[test]
    fn cannot_write_after_abort() {
        let mut txn = create_txn();
        txn.mark_aborted();
        assert!(txn.delete(POSTS, id(1), None).is_err());
    }

    #[test]
    fn take_writes_empties_transaction() {
        let mut txn = create_txn();
        txn.insert(POSTS, id(1), vec![1], None).unwrap();
        let writes = txn.take_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(txn.write_count(), 0);
    }

    #[test]
    fn document_accessor_reads_tag() {
        let doc = IndexDocument::new(id(1)).with_field("title", "help");
        let write = PendingWrite::Delete {
            document: Some(doc.clone()),
        };
        assert_eq!(write.document(), Some(&doc));
    }
}
