//! File-backed key store.
//!
//! One JSON document per organization at `{dir}/{sha256(identifier)}.json`.
//! Hashing the identifier keeps arbitrary organization names out of file
//! paths. Files are created with `create_new`, which fails if the file
//! exists, so two processes sharing the directory cannot both persist a
//! keypair for the same organization. On Unix the files are mode 0600.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use certrust_core::{sha256_bytes, OrganizationCode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use super::{InsertOutcome, KeyStore, KeyStoreError, StoredKeyPair};

#[derive(Serialize)]
struct KeyFileRef<'a> {
    organization: &'a str,
    public_key_pem: &'a str,
    private_key_pem: &'a str,
}

#[derive(Deserialize)]
struct KeyFile {
    organization: String,
    public_key_pem: String,
    private_key_pem: String,
}

/// Key store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `dir`. The directory is created on the
    /// first insert.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, org: &OrganizationCode) -> PathBuf {
        let digest = sha256_bytes(org.as_str().as_bytes());
        self.dir.join(format!("{}.json", digest.to_hex()))
    }

    fn open_new(path: &Path) -> std::io::Result<fs::File> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path)
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self, org: &OrganizationCode) -> Result<Option<StoredKeyPair>, KeyStoreError> {
        let path = self.path_for(org);
        let bytes = match fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: KeyFile = serde_json::from_slice(&bytes)?;
        if file.organization != org.as_str() {
            return Err(KeyStoreError::Corrupt(format!(
                "{} holds keys for {:?}, expected {:?}",
                path.display(),
                file.organization,
                org.as_str()
            )));
        }
        Ok(Some(StoredKeyPair {
            public_key_pem: file.public_key_pem,
            private_key_pem: Zeroizing::new(file.private_key_pem),
        }))
    }

    fn insert_if_absent(
        &self,
        org: &OrganizationCode,
        pair: StoredKeyPair,
    ) -> Result<InsertOutcome, KeyStoreError> {
        fs::create_dir_all(&self.dir)?;
        let body = Zeroizing::new(serde_json::to_vec_pretty(&KeyFileRef {
            organization: org.as_str(),
            public_key_pem: &pair.public_key_pem,
            private_key_pem: &pair.private_key_pem,
        })?);

        let path = self.path_for(org);
        let mut file = match Self::open_new(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(InsertOutcome::AlreadyPresent)
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = file.write_all(&body).and_then(|()| file.sync_all()) {
            // A half-written file would block every later insert.
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "failed to remove partial key file");
            }
            return Err(e.into());
        }
        Ok(InsertOutcome::Inserted)
    }

    fn contains(&self, org: &OrganizationCode) -> Result<bool, KeyStoreError> {
        Ok(self.path_for(org).is_file())
    }
}
