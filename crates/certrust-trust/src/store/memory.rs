//! In-memory certificate store.
//!
//! All operations are synchronous. The lock is `parking_lot` and is never
//! held across an `.await`, so async handlers may call straight in.

use std::collections::HashMap;
use std::sync::Arc;

use certrust_core::{CertificateId, SubjectId, Timestamp};
use certrust_state::{CertificateRecord, MarkOutcome};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{newest_first, CertificateStore, StoreError};

#[derive(Debug)]
struct Slot<T> {
    seq: u64,
    value: T,
}

#[derive(Debug)]
struct Inner<T> {
    next_seq: u64,
    slots: HashMap<Uuid, Slot<T>>,
}

/// Thread-safe, cloneable in-memory key-value store that remembers
/// insertion order.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<Inner<T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(Inner {
                next_seq: 0,
                slots: HashMap::new(),
            })),
        }
    }

    /// Insert a record unless the key exists. Returns `false` on conflict.
    pub fn insert_new(&self, id: Uuid, value: T) -> bool {
        let mut guard = self.data.write();
        if guard.slots.contains_key(&id) {
            return false;
        }
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.slots.insert(id, Slot { seq, value });
        true
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().slots.get(id).map(|s| s.value.clone())
    }

    /// All records matching `pred`, in insertion order.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let guard = self.data.read();
        let mut hits: Vec<&Slot<T>> = guard.slots.values().filter(|s| pred(&s.value)).collect();
        hits.sort_by_key(|s| s.seq);
        hits.into_iter().map(|s| s.value.clone()).collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock. Returns `None` if the
    /// record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().slots.get_mut(id).map(|s| f(&mut s.value))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.read().slots.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory [`CertificateStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCertificateStore {
    records: Store<CertificateRecord>,
}

impl MemoryCertificateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CertificateStore for MemoryCertificateStore {
    fn insert(&self, record: CertificateRecord) -> Result<CertificateRecord, StoreError> {
        let id = record.id();
        if !self.records.insert_new(*id.as_uuid(), record.clone()) {
            return Err(StoreError::Conflict(id));
        }
        Ok(record)
    }

    fn fetch(&self, id: CertificateId) -> Result<Option<CertificateRecord>, StoreError> {
        Ok(self.records.get(id.as_uuid()))
    }

    fn mark_verified(
        &self,
        id: CertificateId,
        at: Timestamp,
    ) -> Result<(CertificateRecord, MarkOutcome), StoreError> {
        self.records
            .try_update(id.as_uuid(), |record| {
                let outcome = record.mark_verified(at);
                Ok::<_, StoreError>((record.clone(), outcome))
            })
            .unwrap_or(Err(StoreError::NotFound(id)))
    }

    fn list_for_subject(&self, subject: &SubjectId) -> Result<Vec<CertificateRecord>, StoreError> {
        Ok(newest_first(self.records.filter(|r| r.subject() == subject)))
    }
}
