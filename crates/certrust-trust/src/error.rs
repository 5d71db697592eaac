//! # Trust Service Errors
//!
//! Callers must be able to tell an ineligible organization, a malformed
//! payload and a storage failure apart. A bad signature is not an error:
//! it produces an Unverified record.

use certrust_core::{CertificateId, EncodingError};
use certrust_crypto::CryptoError;
use certrust_keys::SigningError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors from the certificate trust service.
#[derive(Error, Debug)]
pub enum TrustError {
    /// The organization is absent from the directory or its status does
    /// not permit issuance. Nothing was canonicalized, verified or stored.
    #[error("organization {organization:?} is not eligible: {reason}")]
    OrganizationNotEligible {
        /// The organization as referenced by the caller.
        organization: String,
        /// Why the gate refused.
        reason: String,
    },

    /// The payload could not be canonicalized.
    #[error("payload encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// No certificate with this identifier.
    #[error("certificate {0} not found")]
    NotFound(CertificateId),

    /// The record cannot be re-verified (its signed bytes were never
    /// retained).
    #[error("certificate {0} cannot be re-verified: {1}")]
    NotReverifiable(CertificateId, &'static str),

    /// Archiving or reading an artifact failed.
    #[error("artifact error: {0}")]
    Artifact(#[from] CryptoError),

    /// The organization's own key failed for a reason other than absence.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// The certificate store failed.
    #[error("certificate store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TrustError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}
