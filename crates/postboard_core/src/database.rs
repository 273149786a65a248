//! Database facade and recovery.

use crate::changes::ChangeTracker;
use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::entity::Record;
use crate::error::{CoreError, CoreResult};
use crate::journal::Journal;
use crate::search::{self, IndexSynchronizer, SearchIndex, SearchResults, Searchable};
use crate::store::{TableStats, TableStore};
use crate::table::Table;
use crate::transaction::{CommitObserver, Transaction, TransactionManager};
use crate::types::SequenceNumber;
use parking_lot::RwLock;
use postboard_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;
use std::sync::Arc;

/// The main database handle.
///
/// Opening a database replays its journal into memory. Writes go through
/// transactions; each commit is one journal frame.
///
/// ```rust,ignore
/// use postboard_core::{Database, InMemorySearchIndex, Post};
/// use std::sync::Arc;
///
/// let db = Database::open(Path::new("board"))?;
/// db.enable_search(Arc::new(InMemorySearchIndex::new()))?;
///
/// db.transaction(|txn| {
///     db.table::<Post>().insert(txn, &mut Post::new("help", "flask help"))?;
///     Ok(())
/// })?;
///
/// let hits = db.search::<Post>("help", 1, 20)?;
/// ```
///
/// For tests, use [`Database::open_in_memory`].
pub struct Database {
    config: Config,
    dir: Option<DatabaseDir>,
    journal: Arc<Journal>,
    txn_manager: TransactionManager,
    synchronizer: RwLock<Option<Arc<IndexSynchronizer>>>,
}

impl Database {
    /// Opens or creates a database directory with the default configuration.
    ///
    /// # Errors
    ///
    /// - another process has the database locked (`DatabaseLocked`)
    /// - the journal is damaged before its tail (`JournalCorruption`)
    /// - I/O errors
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens or creates a database directory.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = DatabaseDir::open(path, config.create_if_missing, config.error_if_exists)?;
        let backend = FileBackend::open(&dir.journal_path())?;
        Self::build(config, Box::new(backend), Some(dir))
    }

    /// Opens a database that lives only in memory.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    /// Opens a database whose journal lives on `backend`.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        Self::build(config, backend, None)
    }

    fn build(
        config: Config,
        backend: Box<dyn StorageBackend>,
        dir: Option<DatabaseDir>,
    ) -> CoreResult<Self> {
        let journal = Arc::new(Journal::new(backend, config.sync_on_commit));
        let records = journal.recover()?;

        let store = Arc::new(TableStore::new());
        let mut max_txid = 0;
        let mut max_seq = 0;
        for record in &records {
            store.apply(record);
            max_txid = max_txid.max(record.txid);
            max_seq = max_seq.max(record.sequence);
        }

        tracing::debug!(
            commits = records.len(),
            committed_seq = max_seq,
            path = ?dir.as_ref().map(DatabaseDir::path),
            "opened database"
        );

        let txn_manager = TransactionManager::with_state(
            Arc::clone(&journal),
            store,
            max_txid + 1,
            max_seq + 1,
            max_seq,
        );

        Ok(Self {
            config,
            dir,
            journal,
            txn_manager,
            synchronizer: RwLock::new(None),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the directory, or `None` for a database not on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(DatabaseDir::path)
    }

    /// Returns the journal size in bytes.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.journal.size()
    }

    /// Begins a transaction.
    pub fn begin(&self) -> Transaction {
        self.txn_manager.begin()
    }

    /// Commits a transaction. See [`TransactionManager::commit`].
    pub fn commit(&self, txn: &mut Transaction) -> CoreResult<SequenceNumber> {
        self.txn_manager.commit(txn)
    }

    /// Aborts a transaction.
    pub fn abort(&self, txn: &mut Transaction) -> CoreResult<()> {
        self.txn_manager.abort(txn)
    }

    /// Runs `f` in a transaction, committing on `Ok` and aborting on `Err`.
    pub fn transaction<F, R>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<R>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(value) => {
                self.commit(&mut txn)?;
                Ok(value)
            }
            Err(e) => {
                if txn.is_active() {
                    self.abort(&mut txn)?;
                }
                Err(e)
            }
        }
    }

    /// Returns typed access to the table of `T`.
    #[must_use]
    pub fn table<T: Record>(&self) -> Table<'_, T> {
        Table::new(self)
    }

    /// Registers a commit observer.
    pub fn add_observer(&self, observer: Arc<dyn CommitObserver>) {
        self.txn_manager.add_observer(observer);
    }

    /// Starts mirroring searchable rows into `index`.
    ///
    /// Registers a [`ChangeTracker`] followed by an [`IndexSynchronizer`]
    /// using the configured failure policy. Rows committed before this
    /// call are not indexed; use [`reindex`](Self::reindex) for those.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if search is already enabled.
    pub fn enable_search(&self, index: Arc<dyn SearchIndex>) -> CoreResult<Arc<IndexSynchronizer>> {
        let mut slot = self.synchronizer.write();
        if slot.is_some() {
            return Err(CoreError::invalid_operation("search is already enabled"));
        }

        let synchronizer = Arc::new(IndexSynchronizer::new(
            index,
            self.config.index_failure_policy,
        ));
        self.txn_manager
            .add_observer(Arc::new(ChangeTracker::new()));
        self.txn_manager.add_observer(synchronizer.clone());
        *slot = Some(Arc::clone(&synchronizer));
        Ok(synchronizer)
    }

    /// Returns the synchronizer, if search is enabled.
    #[must_use]
    pub fn synchronizer(&self) -> Option<Arc<IndexSynchronizer>> {
        self.synchronizer.read().clone()
    }

    /// Returns the search index, if search is enabled.
    #[must_use]
    pub fn search_index(&self) -> Option<Arc<dyn SearchIndex>> {
        self.synchronizer
            .read()
            .as_ref()
            .map(|sync| Arc::clone(sync.index()))
    }

    /// Searches `T` in the enabled index. See [`search::search`].
    pub fn search<T: Searchable>(
        &self,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> CoreResult<SearchResults<T>> {
        let index = self.require_index()?;
        search::search(self, index.as_ref(), expression, page, per_page)
    }

    /// Like [`search`](Self::search) with the configured page size.
    pub fn search_page<T: Searchable>(
        &self,
        expression: &str,
        page: usize,
    ) -> CoreResult<SearchResults<T>> {
        self.search(expression, page, self.config.default_per_page)
    }

    /// Rebuilds the enabled index entries of `T`. See [`search::reindex`].
    pub fn reindex<T: Searchable>(&self) -> CoreResult<usize> {
        let index = self.require_index()?;
        search::reindex::<T>(self, index.as_ref())
    }

    /// Returns the last committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.txn_manager.committed_seq()
    }

    /// Returns row counts per table.
    #[must_use]
    pub fn table_stats(&self) -> Vec<TableStats> {
        self.store().stats()
    }

    pub(crate) fn store(&self) -> &TableStore {
        self.txn_manager.store()
    }

    fn require_index(&self) -> CoreResult<Arc<dyn SearchIndex>> {
        self.search_index()
            .ok_or_else(|| CoreError::invalid_operation("search is not enabled"))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("committed_seq", &self.committed_seq())
            .field("search_enabled", &self.synchronizer.read().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::search::InMemorySearchIndex;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Memo {
        #[serde(skip)]
        id: Option<EntityId>,
        text: String,
    }

    impl Memo {
        fn new(text: &str) -> Self {
            Self {
                id: None,
                text: text.into(),
            }
        }
    }

    impl Record for Memo {
        const TABLE: &'static str = "memos";

        fn id(&self) -> Option<EntityId> {
            self.id
        }

        fn set_id(&mut self, id: EntityId) {
            self.id = Some(id);
        }

        fn index_document(&self) -> Option<crate::IndexDocument> {
            self.to_index_document()
        }
    }

    impl Searchable for Memo {
        const SEARCHABLE_FIELDS: &'static [&'static str] = &["text"];

        fn field_text(&self, field: &str) -> Option<String> {
            match field {
                "text" => Some(self.text.clone()),
                _ => None,
            }
        }
    }

    fn insert_memos(db: &Database, texts: &[&str]) -> Vec<EntityId> {
        db.transaction(|txn| {
            let mut ids = Vec::new();
            for text in texts {
                ids.push(db.table::<Memo>().insert(txn, &mut Memo::new(text))?);
            }
            Ok(ids)
        })
        .unwrap()
    }

    #[test]
    fn open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
        assert_eq!(db.committed_seq(), SequenceNumber::new(0));
    }

    #[test]
    fn transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        insert_memos(&db, &["a"]);
        assert_eq!(db.table::<Memo>().count(), 1);
        assert_eq!(db.committed_seq(), SequenceNumber::new(1));
    }

    #[test]
    fn transaction_aborts_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: CoreResult<()> = db.transaction(|txn| {
            db.table::<Memo>().insert(txn, &mut Memo::new("a"))?;
            Err(CoreError::invalid_operation("changed my mind"))
        });
        assert!(result.is_err());
        assert_eq!(db.table::<Memo>().count(), 0);
    }

    #[test]
    fn reopen_replays_journal() {
        let tmp = tempdir().unwrap();
        {
            let db = Database::open(tmp.path()).unwrap();
            insert_memos(&db, &["first", "second"]);
            db.transaction(|txn| db.table::<Memo>().delete(txn, EntityId::new(1)))
                .unwrap();
        }

        let db = Database::open(tmp.path()).unwrap();
        let memos = db.table::<Memo>().scan_all().unwrap();
        assert_eq!(memos.len(), 1);
        assert_eq!(memos[0].text, "second");
        assert_eq!(db.committed_seq(), SequenceNumber::new(2));

        // ids continue after the highest seen
        let ids = insert_memos(&db, &["third"]);
        assert_eq!(ids, vec![EntityId::new(3)]);
    }

    #[test]
    fn enable_search_twice_fails() {
        let db = Database::open_in_memory().unwrap();
        db.enable_search(Arc::new(InMemorySearchIndex::new()))
            .unwrap();
        assert!(db
            .enable_search(Arc::new(InMemorySearchIndex::new()))
            .is_err());
    }

    #[test]
    fn search_requires_enabled_index() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.search::<Memo>("x", 1, 10),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn committed_rows_become_searchable() {
        let db = Database::open_in_memory().unwrap();
        db.enable_search(Arc::new(InMemorySearchIndex::new()))
            .unwrap();
        insert_memos(&db, &["buy milk", "walk dog", "milk the cow"]);

        let (items, total) = db.search::<Memo>("milk", 1, 10).unwrap().into_parts();
        assert_eq!(total, 2);
        let ids: Vec<_> = items.iter().filter_map(|m| m.id).collect();
        assert_eq!(ids, vec![EntityId::new(1), EntityId::new(3)]);
    }

    #[test]
    fn reindex_picks_up_rows_from_before_enable() {
        let db = Database::open_in_memory().unwrap();
        insert_memos(&db, &["buy milk", "walk dog"]);

        db.enable_search(Arc::new(InMemorySearchIndex::new()))
            .unwrap();
        assert_eq!(db.search::<Memo>("milk", 1, 10).unwrap().total, 0);

        assert_eq!(db.reindex::<Memo>().unwrap(), 2);
        assert_eq!(db.reindex::<Memo>().unwrap(), 2);
        assert_eq!(db.search::<Memo>("milk", 1, 10).unwrap().total, 1);
    }

    #[test]
    fn zero_page_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.enable_search(Arc::new(InMemorySearchIndex::new()))
            .unwrap();
        assert!(db.search::<Memo>("milk", 0, 10).is_err());
        assert!(db.search::<Memo>("milk", 1, 0).is_err());
    }

    #[test]
    fn search_page_uses_default_size() {
        let db = Database::open_in_memory().unwrap();
        db.enable_search(Arc::new(InMemorySearchIndex::new()))
            .unwrap();
        let texts: Vec<String> = (0..30).map(|i| format!("note {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        insert_memos(&db, &refs);

        let page = db.search_page::<Memo>("note", 1).unwrap();
        assert_eq!(page.len(), 25);
        assert_eq!(page.total, 30);
    }

    #[test]
    fn table_stats_lists_tables() {
        let db = Database::open_in_memory().unwrap();
        insert_memos(&db, &["a", "b"]);
        let stats = db.table_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].table, "memos");
        assert_eq!(stats[0].rows, 2);
    }
}
