//! # certrust-trust — Certificate Trust Lifecycle
//!
//! Ties the key registry to durable certificate records.
//!
//! - [`service`]: the eligibility gate, payload and credential-proof
//!   submission, re-verification and listing.
//! - [`store`]: the certificate store trait with in-memory and
//!   JSON-file backends.
//!
//! A record moves `UNVERIFIED → VERIFIED` at most once. Nothing here ever
//! moves it back.

pub mod error;
pub mod service;
pub mod store;

pub use error::TrustError;
pub use service::{
    CredentialProofSubmission, PayloadSubmission, Reverification, Submission, TrustService,
    PAYLOAD_ARTIFACT, UPLOAD_ARTIFACT,
};
pub use store::{CertificateStore, FileCertificateStore, MemoryCertificateStore, StoreError};
