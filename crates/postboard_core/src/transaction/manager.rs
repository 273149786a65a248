//! Transaction manager.

use crate::error::{CoreError, CoreResult};
use crate::journal::{CommitRecord, Journal, JournalOp, OpKind};
use crate::store::TableStore;
use crate::transaction::observer::CommitObserver;
use crate::transaction::state::{PendingWrite, Transaction};
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Runs commits and aborts, and the observer hooks around them.
///
/// A commit proceeds as:
///
/// 1. every observer's `before_commit` (an error aborts)
/// 2. pending writes drained into one journal frame and flushed
/// 3. the frame applied to the tables, transaction marked committed
/// 4. every observer's `after_commit`
/// 5. the transaction context cleared
///
/// Commits are serialized by a write lock held through step 4, so
/// observers see commits in sequence order. Observers must not commit on
/// the same manager from inside a hook.
pub struct TransactionManager {
    journal: Arc<Journal>,
    store: Arc<TableStore>,
    observers: RwLock<Vec<Arc<dyn CommitObserver>>>,
    next_txid: AtomicU64,
    next_seq: AtomicU64,
    committed_seq: AtomicU64,
    write_lock: Mutex<()>,
    active_txns: RwLock<Vec<TransactionId>>,
}

impl TransactionManager {
    /// Creates a transaction manager for an empty journal.
    pub fn new(journal: Arc<Journal>, store: Arc<TableStore>) -> Self {
        Self::with_state(journal, store, 1, 1, 0)
    }

    /// Creates a transaction manager initialized from recovery state.
    pub fn with_state(
        journal: Arc<Journal>,
        store: Arc<TableStore>,
        next_txid: u64,
        next_seq: u64,
        committed_seq: u64,
    ) -> Self {
        Self {
            journal,
            store,
            observers: RwLock::new(Vec::new()),
            next_txid: AtomicU64::new(next_txid),
            next_seq: AtomicU64::new(next_seq),
            committed_seq: AtomicU64::new(committed_seq),
            write_lock: Mutex::new(()),
            active_txns: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer. Observers run in registration order.
    pub fn add_observer(&self, observer: Arc<dyn CommitObserver>) {
        self.observers.write().push(observer);
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Begins a new transaction.
    pub fn begin(&self) -> Transaction {
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        self.active_txns.write().push(txid);
        Transaction::new(txid)
    }

    /// Commits a transaction.
    ///
    /// Returns the commit's sequence number. A transaction with no writes
    /// still runs the observers but writes no journal frame and returns
    /// the current committed sequence.
    ///
    /// # Errors
    ///
    /// An error from `before_commit` or from the journal aborts the
    /// transaction. An error from `after_commit` is returned after every
    /// observer ran; the commit itself stands and the transaction is
    /// `Committed`.
    pub fn commit(&self, txn: &mut Transaction) -> CoreResult<SequenceNumber> {
        if !txn.is_active() {
            return Err(CoreError::invalid_operation("transaction not active"));
        }

        let _write_guard = self.write_lock.lock();
        let observers = self.observers.read().clone();

        for observer in &observers {
            if let Err(e) = observer.before_commit(txn) {
                self.rollback(txn, &observers);
                return Err(e);
            }
        }

        let txid = txn.id();
        let writes = txn.take_writes();
        let sequence = if writes.is_empty() {
            SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
        } else {
            let sequence = SequenceNumber::new(self.next_seq.fetch_add(1, Ordering::SeqCst));
            let mut record = CommitRecord::new(txid, sequence);
            for ((table, id), write) in writes {
                let kind = match write {
                    PendingWrite::Insert { payload, .. } | PendingWrite::Update { payload, .. } => {
                        OpKind::Put(payload)
                    }
                    PendingWrite::Delete { .. } => OpKind::Delete,
                };
                record.ops.push(JournalOp {
                    table: table.to_string(),
                    id,
                    kind,
                });
            }

            if let Err(e) = self.journal.append(&record) {
                self.rollback(txn, &observers);
                return Err(e);
            }
            self.store.apply(&record);
            self.committed_seq
                .store(sequence.as_u64(), Ordering::SeqCst);
            tracing::debug!(%txid, %sequence, ops = record.ops.len(), "committed");
            sequence
        };

        self.active_txns.write().retain(|&id| id != txid);
        txn.mark_committed();

        let mut first_error = None;
        for observer in &observers {
            if let Err(e) = observer.after_commit(txn) {
                tracing::debug!(%txid, error = %e, "after_commit observer failed");
                first_error.get_or_insert(e);
            }
        }
        txn.context_mut().clear();

        match first_error {
            Some(e) => Err(e),
            None => Ok(sequence),
        }
    }

    /// Aborts a transaction, discarding its writes.
    pub fn abort(&self, txn: &mut Transaction) -> CoreResult<()> {
        if !txn.is_active() {
            return Err(CoreError::invalid_operation("transaction not active"));
        }
        let observers = self.observers.read().clone();
        self.rollback(txn, &observers);
        Ok(())
    }

    fn rollback(&self, txn: &mut Transaction, observers: &[Arc<dyn CommitObserver>]) {
        let txid = txn.id();
        txn.discard_writes();
        txn.mark_aborted();
        for observer in observers {
            observer.after_rollback(txn);
        }
        txn.context_mut().clear();
        self.active_txns.write().retain(|&id| id != txid);
        tracing::debug!(%txid, "rolled back");
    }

    /// Returns the last committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Returns the number of transactions begun but not finished.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_txns.read().len()
    }

    /// Returns the committed tables.
    #[must_use]
    pub fn store(&self) -> &Arc<TableStore> {
        &self.store
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("committed_seq", &self.committed_seq())
            .field("observers", &self.observer_count())
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}
