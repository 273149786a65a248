//! Typed access to one table.

use crate::database::Database;
use crate::entity::{decode_record, encode_record, EntityId, Record};
use crate::error::{CoreError, CoreResult};
use crate::transaction::{PendingWrite, Transaction};
use std::marker::PhantomData;

/// Typed handle for the rows of `T::TABLE`.
///
/// Writes go through a transaction; reads without a transaction see
/// committed rows only.
///
/// # Example
///
/// ```rust,ignore
/// let teams = db.table::<Team>();
/// db.transaction(|txn| {
///     teams.insert(txn, &mut Team::new("team1"))?;
///     Ok(())
/// })?;
/// let first = teams.find_first(|t| t.name == "team1")?;
/// ```
pub struct Table<'db, T: Record> {
    db: &'db Database,
    _marker: PhantomData<fn() -> T>,
}

impl<'db, T: Record> Table<'db, T> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        T::TABLE
    }

    /// Inserts a new row, assigning its id.
    ///
    /// The id is burned even if the transaction later aborts.
    pub fn insert(&self, txn: &mut Transaction, record: &mut T) -> CoreResult<EntityId> {
        if let Some(id) = record.id() {
            return Err(CoreError::invalid_operation(format!(
                "{} row already has id {id}",
                T::TABLE
            )));
        }
        let id = self.db.store().allocate_id(T::TABLE);
        record.set_id(id);
        let payload = encode_record(record)?;
        txn.insert(T::TABLE, id, payload, record.index_document())?;
        Ok(id)
    }

    /// Replaces an existing row.
    pub fn update(&self, txn: &mut Transaction, record: &T) -> CoreResult<()> {
        let id = record.id().ok_or_else(|| {
            CoreError::invalid_operation(format!("cannot update a {} row without an id", T::TABLE))
        })?;
        if !self.exists_in(txn, id) {
            return Err(CoreError::entity_not_found(T::TABLE, id.as_i64()));
        }
        let payload = encode_record(record)?;
        txn.update(T::TABLE, id, payload, record.index_document())
    }

    /// Deletes a row.
    ///
    /// The row is loaded first so that its index document travels with
    /// the delete.
    pub fn delete(&self, txn: &mut Transaction, id: EntityId) -> CoreResult<()> {
        let current = self
            .get_in_txn(txn, id)?
            .ok_or_else(|| CoreError::entity_not_found(T::TABLE, id.as_i64()))?;
        txn.delete(T::TABLE, id, current.index_document())
    }

    /// Gets a committed row.
    pub fn get(&self, id: EntityId) -> CoreResult<Option<T>> {
        self.db
            .store()
            .get(T::TABLE, id)
            .map(|bytes| decode_record(id, &bytes))
            .transpose()
    }

    /// Gets a row as the transaction sees it, including its own writes.
    pub fn get_in_txn(&self, txn: &Transaction, id: EntityId) -> CoreResult<Option<T>> {
        match txn.pending_write(T::TABLE, id) {
            Some(PendingWrite::Insert { payload, .. } | PendingWrite::Update { payload, .. }) => {
                decode_record(id, payload).map(Some)
            }
            Some(PendingWrite::Delete { .. }) => Ok(None),
            None => self.get(id),
        }
    }

    /// Gets the committed rows among `ids`, in `ids` order. Missing ids
    /// are skipped.
    pub fn get_many(&self, ids: &[EntityId]) -> CoreResult<Vec<T>> {
        self.db
            .store()
            .get_many(T::TABLE, ids)
            .into_iter()
            .map(|(id, bytes)| decode_record(id, &bytes))
            .collect()
    }

    /// Returns every committed row in id order.
    pub fn scan_all(&self) -> CoreResult<Vec<T>> {
        self.db
            .store()
            .scan(T::TABLE)
            .into_iter()
            .map(|(id, bytes)| decode_record(id, &bytes))
            .collect()
    }

    /// Returns the number of committed rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.db.store().count(T::TABLE)
    }

    /// Returns the first committed row, in id order, matching `predicate`.
    pub fn find_first<F>(&self, mut predicate: F) -> CoreResult<Option<T>>
    where
        F: FnMut(&T) -> bool,
    {
        for (id, bytes) in self.db.store().scan(T::TABLE) {
            let row: T = decode_record(id, &bytes)?;
            if predicate(&row) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Returns every committed row matching `predicate`, in id order.
    pub fn filter<F>(&self, mut predicate: F) -> CoreResult<Vec<T>>
    where
        F: FnMut(&T) -> bool,
    {
        let mut rows = self.scan_all()?;
        rows.retain(|row| predicate(row));
        Ok(rows)
    }

    fn exists_in(&self, txn: &Transaction, id: EntityId) -> bool {
        match txn.pending_write(T::TABLE, id) {
            Some(PendingWrite::Delete { .. }) => false,
            Some(_) => true,
            None => self.db.store().contains(T::TABLE, id),
        }
    }
}

impl<T: Record> std::fmt::Debug for Table<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("name", &T::TABLE).finish()
    }
}
