//! Transactions and their lifecycle hooks.
//!
//! A transaction buffers writes until commit. The manager appends the
//! whole commit as one journal frame, applies it to the tables, and
//! notifies [`CommitObserver`]s:
//!
//! - `before_commit`, while the pending writes are still readable
//! - `after_commit`, once the commit is durable
//! - `after_rollback`, when the writes were discarded

mod manager;
mod observer;
mod state;

pub use manager::TransactionManager;
pub use observer::CommitObserver;
pub use state::{PendingWrite, Transaction, TransactionContext, TransactionState, WriteKey};
