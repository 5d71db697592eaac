//! # certrust-core — Foundational Types
//!
//! The leaf of the certrust crate graph. Defines the primitives every other
//! crate builds on:
//!
//! 1. **`CanonicalBytes` newtype.** The deterministic byte encoding of a
//!    JSON-like value. Signing and verification of structured payloads
//!    always flow through `canonicalize()`, so two structurally equal values
//!    can never produce different signed bytes.
//!
//! 2. **Typed identifiers.** `OrganizationCode`, `OrganizationRef`,
//!    `SubjectId` and `CertificateId` instead of bare strings. An
//!    `OrganizationRef` carries its resolution mode (code, name, or either)
//!    so the two-phase lookup rule is explicit at every call site.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision,
//!    which is what the certificate lifecycle stamps on first verification.
//!
//! 4. **Content digests.** `ContentDigest` names archived artifacts.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `certrust-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::{canonicalize, CanonicalBytes, MAX_NESTING_DEPTH};
pub use digest::{sha256_bytes, sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{CoreError, EncodingError, ValidationError};
pub use identity::{CertificateId, OrganizationCode, OrganizationRef, SubjectId};
pub use temporal::Timestamp;
