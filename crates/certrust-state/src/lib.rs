//! # certrust-state — Certificate Trust Lifecycle
//!
//! A certificate record is created **Unverified** and transitions at most
//! once to **Verified**. There is no rejected state: a failed check leaves
//! the record where it was, and a later successful check never moves the
//! original verification timestamp.

pub mod certificate;

pub use certificate::{
    CertificateDraft, CertificateError, CertificateKind, CertificateRecord, CertificateState,
    MarkOutcome,
};
