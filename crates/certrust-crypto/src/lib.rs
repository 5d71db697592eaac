//! # certrust-crypto — Cryptographic Primitives
//!
//! - **RSA organization keys.** [`RsaKeyPair`] and [`RsaPublicKey`] wrap the
//!   `rsa` crate with PEM transport (PKCS#8 private, SPKI public) and a
//!   minimum modulus of 2048 bits.
//! - **Signatures.** [`OrgSignature`] is the opaque RSASSA-PKCS1-v1_5 /
//!   SHA-256 signature. It carries no algorithm tag; the algorithm is fixed
//!   workspace-wide. At every boundary it travels as standard base64.
//! - **Content-addressed storage.** [`ArtifactStore`] archives opaque bytes
//!   under `{kind}/{sha256}.bin` and re-checks the digest on every read.

pub mod cas;
pub mod error;
pub mod keypair;

pub use cas::{ArtifactKind, ArtifactRef, ArtifactStore};
pub use error::CryptoError;
pub use keypair::{OrgSignature, RsaKeyPair, RsaPublicKey, DEFAULT_MODULUS_BITS, MIN_MODULUS_BITS};

pub use certrust_core::{sha256_bytes, sha256_digest};
