//! # Content Digests
//!
//! [`ContentDigest`] names archived artifacts. The algorithm tag travels with
//! the digest so a stored artifact pointer stays self-describing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm used to compute a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex digest value.
    pub hex: String,
}

impl ContentDigest {
    /// Create a SHA-256 content digest from its raw 32 bytes.
    pub fn sha256(bytes: [u8; 32]) -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            hex: bytes.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }

    /// Return the digest as a lowercase hex string.
    pub fn to_hex(&self) -> &str {
        &self.hex
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// SHA-256 over canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    sha256_bytes(data.as_bytes())
}

/// SHA-256 over opaque bytes (uploaded artifacts, key identifiers).
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::sha256(bytes)
}
