//! Transaction lifecycle observers.

use crate::error::CoreResult;
use crate::transaction::Transaction;

/// Hooks the transaction manager calls around every commit.
///
/// Observers run in registration order. State that must travel from
/// `before_commit` to `after_commit` goes into the transaction's
/// [`TransactionContext`](crate::TransactionContext), never into the
/// observer, so concurrent transactions cannot see each other's data.
pub trait CommitObserver: Send + Sync {
    /// Called before the physical commit. Pending writes are still
    /// available through [`Transaction::pending_writes`]; they are gone
    /// once this phase ends.
    ///
    /// An error aborts the transaction.
    fn before_commit(&self, _txn: &mut Transaction) -> CoreResult<()> {
        Ok(())
    }

    /// Called after the commit is durable and visible.
    ///
    /// An error is returned from `commit`, but the commit stands.
    fn after_commit(&self, _txn: &mut Transaction) -> CoreResult<()> {
        Ok(())
    }

    /// Called after the transaction's writes were discarded.
    fn after_rollback(&self, _txn: &mut Transaction) {}
}
