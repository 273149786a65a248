//! Post search index saved next to the journal.
//!
//! The index is written to `search.idx` in the database directory together
//! with the sequence number it reflects. Opening a board loads it when that
//! sequence matches the journal and rebuilds it from the posts otherwise.
//! Commands that write posts commit through the index and save it again.

use super::{open, CliResult};
use postboard_core::{Database, InMemorySearchIndex, IndexSnapshot, Post, TokenizerConfig};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// File name of the saved index.
pub const INDEX_FILE: &str = "search.idx";

#[derive(Serialize, Deserialize)]
struct SavedIndex {
    committed_seq: u64,
    snapshot: IndexSnapshot,
}

/// A database with search enabled over the saved post index.
pub struct IndexedBoard {
    /// The database.
    pub db: Database,
    /// The index kept in step with `db`.
    pub index: Arc<InMemorySearchIndex>,
    index_path: PathBuf,
}

impl IndexedBoard {
    /// Opens the board, loading the saved index or rebuilding a stale one.
    pub fn open(path: &Path) -> CliResult<Self> {
        let db = open(path)?;
        let index_path = path.join(INDEX_FILE);

        let board = match load(&index_path, db.committed_seq().as_u64()) {
            Some(snapshot) => {
                let index = Arc::new(InMemorySearchIndex::from_snapshot(
                    TokenizerConfig::default(),
                    snapshot,
                ));
                db.enable_search(index.clone())?;
                Self {
                    db,
                    index,
                    index_path,
                }
            }
            None => {
                let (board, indexed) = Self::build(db, index_path)?;
                debug!(indexed, "rebuilt post index");
                board
            }
        };
        Ok(board)
    }

    /// Opens the board and rebuilds its index from the posts, whatever is
    /// saved. Returns the board and the number of posts indexed.
    pub fn rebuild(path: &Path) -> CliResult<(Self, usize)> {
        let db = open(path)?;
        Self::build(db, path.join(INDEX_FILE))
    }

    fn build(db: Database, index_path: PathBuf) -> CliResult<(Self, usize)> {
        let index = Arc::new(InMemorySearchIndex::new());
        db.enable_search(index.clone())?;
        let indexed = db.reindex::<Post>()?;
        let board = Self {
            db,
            index,
            index_path,
        };
        board.save()?;
        Ok((board, indexed))
    }

    /// Writes the index and the sequence it reflects.
    pub fn save(&self) -> CliResult<()> {
        let saved = SavedIndex {
            committed_seq: self.db.committed_seq().as_u64(),
            snapshot: self.index.snapshot(),
        };

        let tmp_path = self.index_path.with_extension("idx.tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        ciborium::into_writer(&saved, &mut writer).map_err(|e| e.to_string())?;
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp_path, &self.index_path)?;
        Ok(())
    }
}

/// Reads the saved snapshot if it reflects `committed_seq`.
fn load(index_path: &Path, committed_seq: u64) -> Option<IndexSnapshot> {
    let file = match File::open(index_path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = ?index_path, error = %e, "cannot open saved index");
            return None;
        }
    };

    match ciborium::from_reader::<SavedIndex, _>(BufReader::new(file)) {
        Ok(saved) if saved.committed_seq == committed_seq => Some(saved.snapshot),
        Ok(saved) => {
            debug!(
                saved = saved.committed_seq,
                committed = committed_seq,
                "saved index is out of date"
            );
            None
        }
        Err(e) => {
            warn!(path = ?index_path, error = %e, "cannot decode saved index");
            None
        }
    }
}
