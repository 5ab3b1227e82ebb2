//! In-memory record store for tests/dev.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::Record;
use crate::store::{RecordStore, StoreError};

/// `BTreeMap`-backed record store.
///
/// - Each call is atomic; there are no multi-call transactions.
/// - Generated keys start at 1 and increase monotonically.
/// - `writes()` counts successful mutations, which lets tests assert that
///   nothing changed after a drain.
#[derive(Debug)]
pub struct InMemoryRecordStore<T: Record> {
    rows: RwLock<BTreeMap<T::Key, T>>,
    next_key: AtomicU64,
    writes: AtomicU64,
}

impl<T: Record> InMemoryRecordStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with keyed records.
    pub fn seeded(records: impl IntoIterator<Item = T>) -> Result<Self, StoreError> {
        let store = Self::new();
        for record in records {
            store.save(record)?;
        }
        store.writes.store(0, Ordering::SeqCst);
        Ok(store)
    }

    /// Every record in key order.
    pub fn snapshot(&self) -> Vec<T> {
        match self.rows.read() {
            Ok(rows) => rows.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}

impl<T: Record> Default for InMemoryRecordStore<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_key: AtomicU64::new(1),
            writes: AtomicU64::new(0),
        }
    }
}

impl<T: Record> RecordStore<T> for InMemoryRecordStore<T> {
    fn find(&self, key: &T::Key) -> Result<Option<T>, StoreError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.get(key).cloned())
    }

    fn find_range(&self, low: &T::Key, high: &T::Key) -> Result<Vec<T>, StoreError> {
        if low > high {
            return Ok(vec![]);
        }
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows
            .range(low.clone()..=high.clone())
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn save(&self, mut record: T) -> Result<T::Key, StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;

        let key = match record.key() {
            Some(key) => key,
            None => record.assign_key(self.next_key.fetch_add(1, Ordering::SeqCst)),
        };
        if rows.contains_key(&key) {
            return Err(StoreError::conflict::<T>(&key));
        }

        rows.insert(key.clone(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(key)
    }

    fn update(&self, key: &T::Key, record: T) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        match rows.get_mut(key) {
            Some(slot) => {
                *slot = record;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::not_found::<T>(key)),
        }
    }

    fn delete(&self, key: &T::Key) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        match rows.remove(key) {
            Some(_) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::not_found::<T>(key)),
        }
    }
}
