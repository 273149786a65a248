//! # Postboard Core
//!
//! Storage engine, domain model and search indexing for Postboard.
//!
//! This crate provides:
//! - a journaled entity store with typed tables and transactions
//! - commit observers with a per-transaction context
//! - the message board records: users, posts, teams, positions, comments
//! - commit-synchronized full-text search over searchable records
//!
//! ## Search flow
//!
//! ```text
//! insert/update/delete ──► Transaction (pending writes + index documents)
//!                               │ commit
//!                               ▼
//!            ChangeTracker.before_commit ──► ChangeSet in context
//!                               │ journal append, apply
//!                               ▼
//!          IndexSynchronizer.after_commit ──► SearchIndex
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
mod config;
mod database;
mod dir;
mod entity;
mod error;
mod journal;
mod model;
mod search;
mod store;
mod table;
mod transaction;
mod types;

pub use changes::{ChangeKind, ChangeSet, ChangeTracker, TrackedEntity};
pub use config::{Config, IndexFailurePolicy};
pub use database::Database;
pub use entity::{decode_record, encode_record, EntityId, Record};
pub use error::{CoreError, CoreResult};
pub use journal::{CommitRecord, JournalOp, OpKind, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use model::{load_user, Comment, Position, Post, Team, User};
pub use search::{
    reindex, search, IndexDocument, IndexSnapshot, IndexSynchronizer, InMemorySearchIndex, QueryHits,
    SearchIndex, SearchResults, Searchable, TokenizerConfig,
};
pub use store::TableStats;
pub use table::Table;
pub use transaction::{
    CommitObserver, PendingWrite, Transaction, TransactionContext, TransactionManager,
    TransactionState, WriteKey,
};
pub use types::{SequenceNumber, TransactionId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
