//! Commit-synchronized text search.
//!
//! Rows of [`Searchable`] tables are mirrored into a [`SearchIndex`]:
//!
//! - the [`ChangeTracker`](crate::ChangeTracker) captures a transaction's
//!   created, modified and deleted rows before the physical commit
//! - the [`IndexSynchronizer`] replays that change set against the index
//!   once the commit is durable, and never after a rollback
//! - [`search`] asks the index for ranked ids and loads the rows from the
//!   store in that order
//! - [`reindex`] rebuilds a table's index entries from scratch
//!
//! The index is an external collaborator. [`InMemorySearchIndex`] is an
//! in-process implementation with relevance ranking.

mod adapter;
mod document;
mod memory;
mod searchable;
mod sync;

pub use adapter::{QueryHits, SearchIndex};
pub use document::IndexDocument;
pub use memory::{InMemorySearchIndex, IndexSnapshot, TokenizerConfig};
pub use searchable::{reindex, search, SearchResults, Searchable};
pub use sync::IndexSynchronizer;
