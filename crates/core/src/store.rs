//! Record-store collaborator interface.
//!
//! The pipeline never talks to SQL or an embedded KV engine directly; it goes
//! through this trait. Implementations are expected to apply each call
//! atomically, but no multi-call transactions are assumed.

use std::sync::Arc;

use thiserror::Error;

use crate::record::Record;

/// Record-store failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// `update`/`delete` targeted a key with no record.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    /// `save` collided with an existing key.
    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },
}

impl StoreError {
    pub fn not_found<T: Record>(key: &T::Key) -> Self {
        Self::NotFound {
            entity: T::ENTITY,
            key: format!("{key:?}"),
        }
    }

    pub fn conflict<T: Record>(key: &T::Key) -> Self {
        Self::Conflict {
            entity: T::ENTITY,
            key: format!("{key:?}"),
        }
    }
}

/// Key/value persistence for one record type.
pub trait RecordStore<T: Record>: Send + Sync {
    /// Look up a record by key.
    fn find(&self, key: &T::Key) -> Result<Option<T>, StoreError>;

    /// All records with `low <= key <= high`, in ascending key order.
    fn find_range(&self, low: &T::Key, high: &T::Key) -> Result<Vec<T>, StoreError>;

    /// Insert a record, generating a key when it has none. Returns the key.
    fn save(&self, record: T) -> Result<T::Key, StoreError>;

    /// Replace the record stored under `key`.
    fn update(&self, key: &T::Key, record: T) -> Result<(), StoreError>;

    /// Remove the record stored under `key` (used by compensation only).
    fn delete(&self, key: &T::Key) -> Result<(), StoreError>;
}

impl<T, S> RecordStore<T> for Arc<S>
where
    T: Record,
    S: RecordStore<T> + ?Sized,
{
    fn find(&self, key: &T::Key) -> Result<Option<T>, StoreError> {
        (**self).find(key)
    }

    fn find_range(&self, low: &T::Key, high: &T::Key) -> Result<Vec<T>, StoreError> {
        (**self).find_range(low, high)
    }

    fn save(&self, record: T) -> Result<T::Key, StoreError> {
        (**self).save(record)
    }

    fn update(&self, key: &T::Key, record: T) -> Result<(), StoreError> {
        (**self).update(key, record)
    }

    fn delete(&self, key: &T::Key) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}
