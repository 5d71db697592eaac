//! In-memory key store. Data is lost on restart.

use std::collections::HashMap;

use certrust_core::OrganizationCode;
use parking_lot::RwLock;

use super::{InsertOutcome, KeyStore, KeyStoreError, StoredKeyPair};

/// In-memory key store.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<OrganizationCode, StoredKeyPair>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keypairs.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("organizations", &self.len())
            .finish()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, org: &OrganizationCode) -> Result<Option<StoredKeyPair>, KeyStoreError> {
        Ok(self.keys.read().get(org).cloned())
    }

    fn insert_if_absent(
        &self,
        org: &OrganizationCode,
        pair: StoredKeyPair,
    ) -> Result<InsertOutcome, KeyStoreError> {
        let mut keys = self.keys.write();
        if keys.contains_key(org) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        keys.insert(org.clone(), pair);
        Ok(InsertOutcome::Inserted)
    }

    fn contains(&self, org: &OrganizationCode) -> Result<bool, KeyStoreError> {
        Ok(self.keys.read().contains_key(org))
    }
}
