use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;
use vacation_core::{FailureClass, RecordId};

/// Ordered, integer-keyed index shared by every client thread.
///
/// Rows are handed out as `Arc<V>`: callers lock the record itself, never
/// the table, for anything beyond a structural insert or remove. The table
/// lock is only held for the duration of one map operation and is always
/// acquired before any record lock.
pub struct Table<V> {
    name: &'static str,
    rows: RwLock<BTreeMap<RecordId, Arc<V>>>,
}

impl<V> Table<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up a row by id.
    pub fn get(&self, id: RecordId) -> Option<Arc<V>> {
        self.rows.read().get(&id).cloned()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.rows.read().contains_key(&id)
    }

    /// Insert a new row. Fails without touching the table if `id` is taken.
    pub fn insert(&self, id: RecordId, value: V) -> Result<Arc<V>, TableError> {
        self.insert_with(id, || value)
    }

    /// Insert a row built lazily, only once the key is known to be free.
    pub fn insert_with<F>(&self, id: RecordId, make: F) -> Result<Arc<V>, TableError>
    where
        F: FnOnce() -> V,
    {
        let mut rows = self.rows.write();
        if rows.contains_key(&id) {
            return Err(TableError::DuplicateKey { table: self.name, id });
        }
        let row = Arc::new(make());
        rows.insert(id, Arc::clone(&row));
        trace!(table = self.name, id, "row inserted");
        Ok(row)
    }

    /// Remove a row unconditionally.
    pub fn remove(&self, id: RecordId) -> Result<Arc<V>, TableError> {
        let removed = self.rows.write().remove(&id);
        match removed {
            Some(row) => {
                trace!(table = self.name, id, "row removed");
                Ok(row)
            }
            None => Err(TableError::MissingKey { table: self.name, id }),
        }
    }

    /// Remove a row only if `predicate` holds, deciding under the write lock.
    ///
    /// No other thread can look the row up between the check and the
    /// removal, which is what lets callers retire emptied inventory safely.
    pub fn remove_if<P>(&self, id: RecordId, predicate: P) -> Option<Arc<V>>
    where
        P: FnOnce(&V) -> bool,
    {
        let mut rows = self.rows.write();
        let keep = match rows.get(&id) {
            Some(row) => !predicate(row),
            None => return None,
        };
        if keep {
            return None;
        }
        trace!(table = self.name, id, "row removed conditionally");
        rows.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Point-in-time copy of every row, in ascending id order.
    pub fn entries(&self) -> Vec<(RecordId, Arc<V>)> {
        self.rows
            .read()
            .iter()
            .map(|(id, row)| (*id, Arc::clone(row)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("Duplicate key {id} in table {table}")]
    DuplicateKey { table: &'static str, id: RecordId },

    #[error("Key {id} not found in table {table}")]
    MissingKey { table: &'static str, id: RecordId },
}

impl TableError {
    pub fn class(&self) -> FailureClass {
        match self {
            TableError::DuplicateKey { .. } => FailureClass::Precondition,
            TableError::MissingKey { .. } => FailureClass::NotFound,
        }
    }
}
