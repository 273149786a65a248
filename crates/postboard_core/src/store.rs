//! Committed table contents.

use crate::entity::EntityId;
use crate::journal::{CommitRecord, OpKind};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct TableData {
    rows: BTreeMap<EntityId, Vec<u8>>,
    /// Next id to hand out. Never goes backwards.
    next_id: i64,
}

impl TableData {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// Row count of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// Table name.
    pub table: String,
    /// Number of rows.
    pub rows: usize,
}

/// Committed rows of every table, keyed by id.
///
/// Only the transaction manager writes here, and only with commit
/// records that are already in the journal.
#[derive(Debug, Default)]
pub struct TableStore {
    tables: RwLock<HashMap<String, TableData>>,
}

impl TableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next id of a table.
    pub fn allocate_id(&self, table: &str) -> EntityId {
        let mut tables = self.tables.write();
        let data = tables
            .entry(table.to_string())
            .or_insert_with(TableData::new);
        let id = data.next_id;
        data.next_id += 1;
        EntityId::new(id)
    }

    /// Gets a row's payload.
    #[must_use]
    pub fn get(&self, table: &str, id: EntityId) -> Option<Vec<u8>> {
        self.tables
            .read()
            .get(table)
            .and_then(|data| data.rows.get(&id).cloned())
    }

    /// Gets the rows that exist among `ids`. Missing ids are skipped.
    #[must_use]
    pub fn get_many(&self, table: &str, ids: &[EntityId]) -> Vec<(EntityId, Vec<u8>)> {
        let tables = self.tables.read();
        let Some(data) = tables.get(table) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| data.rows.get(id).map(|bytes| (*id, bytes.clone())))
            .collect()
    }

    /// Returns every row of a table in id order.
    #[must_use]
    pub fn scan(&self, table: &str) -> Vec<(EntityId, Vec<u8>)> {
        self.tables
            .read()
            .get(table)
            .map(|data| {
                data.rows
                    .iter()
                    .map(|(id, bytes)| (*id, bytes.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Checks if a row exists.
    #[must_use]
    pub fn contains(&self, table: &str, id: EntityId) -> bool {
        self.tables
            .read()
            .get(table)
            .is_some_and(|data| data.rows.contains_key(&id))
    }

    /// Returns the number of rows in a table.
    #[must_use]
    pub fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map_or(0, |data| data.rows.len())
    }

    /// Applies a commit record.
    ///
    /// Replayed records may carry ids the allocator has not handed out in
    /// this process, so the counter is bumped past every id seen.
    pub fn apply(&self, record: &CommitRecord) {
        let mut tables = self.tables.write();
        for op in &record.ops {
            let data = tables
                .entry(op.table.clone())
                .or_insert_with(TableData::new);
            data.next_id = data.next_id.max(op.id.as_i64() + 1);
            match &op.kind {
                OpKind::Put(payload) => {
                    data.rows.insert(op.id, payload.clone());
                }
                OpKind::Delete => {
                    data.rows.remove(&op.id);
                }
            }
        }
    }

    /// Returns row counts for every known table, sorted by name.
    #[must_use]
    pub fn stats(&self) -> Vec<TableStats> {
        let mut stats: Vec<_> = self
            .tables
            .read()
            .iter()
            .map(|(table, data)| TableStats {
                table: table.clone(),
                rows: data.rows.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.table.cmp(&b.table));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalOp;
    use crate::types::{SequenceNumber, TransactionId};

    fn put(table: &str, id: i64, byte: u8) -> JournalOp {
        JournalOp {
            table: table.into(),
            id: EntityId::new(id),
            kind: OpKind::Put(vec![byte]),
        }
    }

    fn commit(ops: Vec<JournalOp>) -> CommitRecord {
        let mut record = CommitRecord::new(TransactionId::new(1), SequenceNumber::new(1));
        record.ops = ops;
        record
    }

    #[test]
    fn ids_start_at_one_per_table() {
        let store = TableStore::new();
        assert_eq!(store.allocate_id("posts"), EntityId::new(1));
        assert_eq!(store.allocate_id("posts"), EntityId::new(2));
        assert_eq!(store.allocate_id("users"), EntityId::new(1));
    }

    #[test]
    fn apply_puts_and_deletes() {
        let store = TableStore::new();
        store.apply(&commit(vec![put("posts", 1, 10), put("posts", 2, 20)]));
        assert_eq!(store.get("posts", EntityId::new(1)), Some(vec![10]));
        assert_eq!(store.count("posts"), 2);

        store.apply(&commit(vec![JournalOp {
            table: "posts".into(),
            id: EntityId::new(1),
            kind: OpKind::Delete,
        }]));
        assert!(!store.contains("posts", EntityId::new(1)));
        assert_eq!(store.count("posts"), 1);
    }

    #[test]
    fn apply_advances_allocator() {
        let store = TableStore::new();
        store.apply(&commit(vec![put("posts", 9, 1)]));
        assert_eq!(store.allocate_id("posts"), EntityId::new(10));
    }

    #[test]
    fn get_many_skips_missing() {
        let store = TableStore::new();
        store.apply(&commit(vec![put("posts", 1, 1), put("posts", 9, 9)]));

        let rows = store.get_many("posts", &[EntityId::new(9), EntityId::new(3)]);
        assert_eq!(rows, vec![(EntityId::new(9), vec![9])]);
        assert!(store.get_many("users", &[EntityId::new(1)]).is_empty());
    }

    #[test]
    fn scan_is_id_ordered() {
        let store = TableStore::new();
        store.apply(&commit(vec![put("teams", 3, 3), put("teams", 1, 1)]));
        let ids: Vec<_> = store.scan("teams").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![EntityId::new(1), EntityId::new(3)]);
    }

    #[test]
    fn stats_sorted_by_table() {
        let store = TableStore::new();
        store.apply(&commit(vec![put("users", 1, 1), put("posts", 1, 1)]));
        let names: Vec<_> = store.stats().into_iter().map(|s| s.table).collect();
        assert_eq!(names, vec!["posts", "users"]);
    }
}
