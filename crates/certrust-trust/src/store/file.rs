//! File-backed certificate store.
//!
//! The whole store is one JSON document `{"certificates": [...]}` in
//! insertion order. Every write loads the document, applies the change
//! under a process-wide lock, writes a sibling temporary file and renames
//! it over the original, so readers never observe a half-written file.
//! One writing process per file is assumed.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use certrust_core::{CertificateId, SubjectId, Timestamp};
use certrust_state::{CertificateRecord, MarkOutcome};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{newest_first, CertificateStore, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    certificates: Vec<CertificateRecord>,
}

/// Certificate store backed by a single JSON file.
#[derive(Debug)]
pub struct FileCertificateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCertificateStore {
    /// Open (or lazily create) the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Document, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, doc: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let body = serde_json::to_vec_pretty(doc)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CertificateStore for FileCertificateStore {
    fn insert(&self, record: CertificateRecord) -> Result<CertificateRecord, StoreError> {
        let _guard = self.lock.lock();
        let mut doc = self.load()?;
        if doc.certificates.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::Conflict(record.id()));
        }
        doc.certificates.push(record.clone());
        self.save(&doc)?;
        Ok(record)
    }

    fn fetch(&self, id: CertificateId) -> Result<Option<CertificateRecord>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.certificates.into_iter().find(|r| r.id() == id))
    }

    fn mark_verified(
        &self,
        id: CertificateId,
        at: Timestamp,
    ) -> Result<(CertificateRecord, MarkOutcome), StoreError> {
        let _guard = self.lock.lock();
        let mut doc = self.load()?;
        let record = doc
            .certificates
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(StoreError::NotFound(id))?;
        let outcome = record.mark_verified(at);
        let updated = record.clone();
        if matches!(outcome, MarkOutcome::Transitioned { .. }) {
            self.save(&doc)?;
        }
        Ok((updated, outcome))
    }

    fn list_for_subject(&self, subject: &SubjectId) -> Result<Vec<CertificateRecord>, StoreError> {
        let _guard = self.lock.lock();
        let records = self
            .load()?
            .certificates
            .into_iter()
            .filter(|r| r.subject() == subject)
            .collect();
        Ok(newest_first(records))
    }
}
