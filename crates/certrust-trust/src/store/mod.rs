//! # Certificate Store
//!
//! Narrow read/write interface to durable certificate storage.
//!
//! - [`MemoryCertificateStore`]: a locked map, for tests and ephemeral runs.
//! - [`FileCertificateStore`]: a single JSON document rewritten through a
//!   temporary file and an atomic rename.
//!
//! `mark_verified` is a compare-and-set on the verified flag: it runs the
//! record's own transition under one write lock, so concurrent
//! re-verifications stamp the timestamp exactly once.

pub mod file;
pub mod memory;

pub use file::FileCertificateStore;
pub use memory::{MemoryCertificateStore, Store};

use std::fmt::Debug;

use certrust_core::{CertificateId, SubjectId, Timestamp};
use certrust_state::{CertificateRecord, MarkOutcome};

/// Error type for certificate store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with this identifier.
    #[error("certificate {0} not found")]
    NotFound(CertificateId),

    /// A record with this identifier already exists.
    #[error("certificate {0} already exists")]
    Conflict(CertificateId),

    /// Filesystem failure.
    #[error("certificate store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store document could not be encoded or decoded.
    #[error("certificate store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage backend for certificate records.
///
/// Implementations must be thread-safe.
pub trait CertificateStore: Send + Sync + Debug {
    /// Persist a new record and return it as stored.
    fn insert(&self, record: CertificateRecord) -> Result<CertificateRecord, StoreError>;

    /// Fetch a record by identifier.
    fn fetch(&self, id: CertificateId) -> Result<Option<CertificateRecord>, StoreError>;

    /// Compare-and-set Unverified → Verified.
    fn mark_verified(
        &self,
        id: CertificateId,
        at: Timestamp,
    ) -> Result<(CertificateRecord, MarkOutcome), StoreError>;

    /// All records of a subject, newest first.
    fn list_for_subject(&self, subject: &SubjectId) -> Result<Vec<CertificateRecord>, StoreError>;
}

/// Newest first by creation time; ties keep the given (insertion) order
/// reversed.
pub(crate) fn newest_first(mut records: Vec<CertificateRecord>) -> Vec<CertificateRecord> {
    records.reverse();
    records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    records
}
