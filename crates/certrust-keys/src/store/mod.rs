//! # Durable Key Store
//!
//! Narrow storage interface for organization keypairs, keyed by the
//! normalized organization identifier. Only the registry's ensure path
//! writes to it.
//!
//! Two backends:
//! - [`MemoryKeyStore`]: a locked map, for tests and ephemeral runs.
//! - [`FileKeyStore`]: one JSON file per organization.
//!
//! `insert_if_absent` must be atomic in every backend: of two concurrent
//! inserts for the same identifier, exactly one reports
//! [`InsertOutcome::Inserted`].

pub mod file;
pub mod memory;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

use std::fmt::Debug;

use certrust_core::OrganizationCode;
use zeroize::Zeroizing;

/// Error type for key store operations.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// Filesystem failure.
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded or decoded.
    #[error("key store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record is present but does not belong where it was found.
    #[error("corrupt key record: {0}")]
    Corrupt(String),
}

/// The PEM halves of an organization keypair as persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredKeyPair {
    /// SPKI PEM.
    pub public_key_pem: String,
    /// PKCS#8 PEM, wiped from memory on drop.
    pub private_key_pem: Zeroizing<String>,
}

impl Debug for StoredKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Result of an `insert_if_absent` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The keypair was written.
    Inserted,
    /// A keypair already existed; nothing was written.
    AlreadyPresent,
}

/// Storage backend for organization keypairs.
///
/// Implementations must be thread-safe.
pub trait KeyStore: Send + Sync + Debug {
    /// Fetch the keypair stored under `org`.
    fn get(&self, org: &OrganizationCode) -> Result<Option<StoredKeyPair>, KeyStoreError>;

    /// Store `pair` under `org` unless a keypair is already there.
    fn insert_if_absent(
        &self,
        org: &OrganizationCode,
        pair: StoredKeyPair,
    ) -> Result<InsertOutcome, KeyStoreError>;

    /// Whether a keypair is stored under `org`.
    fn contains(&self, org: &OrganizationCode) -> Result<bool, KeyStoreError> {
        Ok(self.get(org)?.is_some())
    }
}
