//! # Content-Addressed Artifact Store
//!
//! Archives opaque bytes (canonical payloads, uploaded certificate files)
//! under `{base_dir}/{kind}/{sha256_hex}.bin`.
//!
//! ## Integrity Invariant
//!
//! The filename encodes the content digest. On every read the digest is
//! recomputed from the stored bytes and compared against the reference.
//! A mismatch is reported as an error, never returned as data.
//!
//! Artifact kinds must match `^[a-z0-9][a-z0-9-]{0,63}$`.

use certrust_core::{sha256_bytes, ContentDigest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

fn validate_kind(kind: &str) -> Result<String, CryptoError> {
    let k = kind.trim().to_lowercase();
    if k.is_empty() {
        return Err(CryptoError::Artifact("artifact kind is required".into()));
    }
    if k.len() > 64 {
        return Err(CryptoError::Artifact(format!(
            "artifact kind too long: {} chars (max 64)",
            k.len()
        )));
    }
    let mut chars = k.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => {
            return Err(CryptoError::Artifact(format!(
                "artifact kind must start with [a-z0-9], got: {k:?}"
            )))
        }
    }
    if let Some(c) = chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')) {
        return Err(CryptoError::Artifact(format!(
            "artifact kind contains invalid character {c:?}"
        )));
    }
    Ok(k)
}

fn validate_digest_hex(hex: &str) -> Result<(), CryptoError> {
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
        return Err(CryptoError::Artifact(format!(
            "digest must be 64 lowercase hex chars, got {hex:?}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ArtifactKind / ArtifactRef
// ---------------------------------------------------------------------------

/// A validated artifact kind (e.g. `"payload"`, `"upload"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactKind(String);

impl ArtifactKind {
    /// Create a validated artifact kind.
    pub fn new(kind: &str) -> Result<Self, CryptoError> {
        validate_kind(kind).map(Self)
    }

    /// The kind as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactKind {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.0
    }
}

/// Pointer to an archived artifact, stored on certificate records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// The artifact kind (first path segment).
    pub kind: ArtifactKind,
    /// SHA-256 digest of the stored bytes.
    pub digest: ContentDigest,
}

impl ArtifactRef {
    /// The file path of this artifact under a store root.
    pub fn path_in(&self, base_dir: &Path) -> PathBuf {
        base_dir
            .join(self.kind.as_str())
            .join(format!("{}.bin", self.digest.to_hex()))
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.digest.to_hex())
    }
}

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// A filesystem-backed content-addressed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `base_dir`. The directory is created on
    /// the first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The store root.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Archive `bytes` under `kind`, returning the reference.
    ///
    /// Storing identical bytes twice is a no-op: the existing file is kept.
    pub fn store(&self, kind: &str, bytes: &[u8]) -> Result<ArtifactRef, CryptoError> {
        let artifact_ref = ArtifactRef {
            kind: ArtifactKind::new(kind)?,
            digest: sha256_bytes(bytes),
        };
        fs::create_dir_all(self.base_dir.join(artifact_ref.kind.as_str()))?;

        let path = artifact_ref.path_in(&self.base_dir);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => f.write_all(bytes)?,
            // Same digest, same content.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
        Ok(artifact_ref)
    }

    /// Read an artifact back, verifying its digest.
    ///
    /// Returns `Ok(None)` when no artifact exists for the reference.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Artifact`] when the stored bytes no longer
    /// hash to the referenced digest.
    pub fn resolve(&self, artifact_ref: &ArtifactRef) -> Result<Option<Vec<u8>>, CryptoError> {
        validate_digest_hex(artifact_ref.digest.to_hex())?;
        let path = artifact_ref.path_in(&self.base_dir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let recomputed = sha256_bytes(&bytes);
        let expected = artifact_ref.digest.to_hex().as_bytes();
        if !bool::from(recomputed.to_hex().as_bytes().ct_eq(expected)) {
            return Err(CryptoError::Artifact(format!(
                "integrity violation: {} hashes to {}",
                path.display(),
                recomputed.to_hex()
            )));
        }
        Ok(Some(bytes))
    }

    /// Whether an artifact exists for the reference.
    pub fn contains(&self, artifact_ref: &ArtifactRef) -> bool {
        validate_digest_hex(artifact_ref.digest.to_hex()).is_ok()
            && artifact_ref.path_in(&self.base_dir).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_kind_accepts_and_normalizes() {
        assert_eq!(validate_kind("payload").unwrap(), "payload");
        assert_eq!(validate_kind(" Upload ").unwrap(), "upload");
        assert_eq!(validate_kind("signed-payload").unwrap(), "signed-payload");
    }

    #[test]
    fn validate_kind_rejects_invalid() {
        assert!(validate_kind("").is_err());
        assert!(validate_kind("-leading").is_err());
        assert!(validate_kind("has/slash").is_err());
        assert!(validate_kind("../escape").is_err());
        assert!(validate_kind(&"a".repeat(65)).is_err());
    }

    #[test]
    fn store_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let r = store.store("payload", br#"{"course":"X"}"#).unwrap();
        assert!(store.contains(&r));
        assert!(r.path_in(dir.path()).ends_with(format!("payload/{}.bin", r.digest.to_hex())));
        assert_eq!(store.resolve(&r).unwrap().unwrap(), br#"{"course":"X"}"#);
    }

    #[test]
    fn store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let a = store.store("upload", b"same bytes").unwrap();
        let b = store.store("upload", b"same bytes").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resolve_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let r = ArtifactRef {
            kind: ArtifactKind::new("payload").unwrap(),
            digest: sha256_bytes(b"never stored"),
        };
        assert!(store.resolve(&r).unwrap().is_none());
        assert!(!store.contains(&r));
    }

    #[test]
    fn resolve_detects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let r = store.store("upload", b"original").unwrap();
        fs::write(r.path_in(dir.path()), b"tampered").unwrap();
        let err = store.resolve(&r).unwrap_err();
        assert!(err.to_string().contains("integrity violation"));
    }

    #[test]
    fn artifact_ref_serde_shape() {
        let r = ArtifactRef {
            kind: ArtifactKind::new("payload").unwrap(),
            digest: sha256_bytes(b""),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["kind"], "payload");
        assert_eq!(json["digest"]["algorithm"], "sha256");
        let back: ArtifactRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
