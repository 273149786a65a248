//! Database directory management.
//!
//! ```text
//! <db_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! └─ journal.log       # Commit journal
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const JOURNAL_FILE: &str = "journal.log";

/// An opened database directory.
///
/// Holds an exclusive lock on `LOCK` until dropped.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens or creates a database directory.
    ///
    /// # Errors
    ///
    /// - the directory is missing and `create_if_missing` is false
    /// - a journal already exists and `error_if_exists` is true
    /// - another process holds the lock (`DatabaseLocked`)
    pub fn open(path: &Path, create_if_missing: bool, error_if_exists: bool) -> CoreResult<Self> {
        if path.exists() {
            if error_if_exists && path.join(JOURNAL_FILE).exists() {
                return Err(CoreError::invalid_format(format!(
                    "database already exists: {}",
                    path.display()
                )));
            }
        } else if create_if_missing {
            fs::create_dir_all(path)?;
        } else {
            return Err(CoreError::invalid_format(format!(
                "database directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the journal file.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directory() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("db");

        let dir = DatabaseDir::open(&path, true, false).unwrap();
        assert!(path.is_dir());
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(dir.journal_path(), path.join(JOURNAL_FILE));
    }

    #[test]
    fn missing_directory_without_create() {
        let tmp = tempdir().unwrap();
        let result = DatabaseDir::open(&tmp.path().join("nope"), false, false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn error_if_exists() {
        let tmp = tempdir().unwrap();
        assert!(DatabaseDir::open(tmp.path(), true, true).is_ok());

        std::fs::write(tmp.path().join(JOURNAL_FILE), b"").unwrap();
        let result = DatabaseDir::open(tmp.path(), true, true);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn second_open_is_locked() {
        let tmp = tempdir().unwrap();
        let _first = DatabaseDir::open(tmp.path(), true, false).unwrap();
        let second = DatabaseDir::open(tmp.path(), true, false);
        assert!(matches!(second, Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let tmp = tempdir().unwrap();
        drop(DatabaseDir::open(tmp.path(), true, false).unwrap());
        assert!(DatabaseDir::open(tmp.path(), true, false).is_ok());
    }
}
