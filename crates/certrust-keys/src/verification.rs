//! # Verification Service
//!
//! Checks a signature against an organization's public key. Verification
//! never errors: a missing key, a malformed signature and a mismatch all
//! collapse to `false`. [`VerificationService::check`] keeps the reason
//! for audit logging.

use std::sync::Arc;

use certrust_core::{CanonicalBytes, OrganizationRef};
use certrust_crypto::{CryptoError, OrgSignature, RsaPublicKey};
use serde::Serialize;
use tracing::{debug, error};

use crate::directory::OrganizationEntry;
use crate::error::RegistryError;
use crate::registry::KeyRegistry;
use crate::signing::CredentialMessage;

/// Why a verification succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The signature verifies.
    Valid,
    /// The organization has no usable public key.
    KeyNotFound,
    /// The signature is not decodable or has the wrong length.
    MalformedSignature,
    /// The signature is well-formed but does not verify over these bytes.
    Mismatch,
}

impl VerificationOutcome {
    /// Whether the signature verified.
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::MalformedSignature => "MALFORMED_SIGNATURE",
            Self::Mismatch => "MISMATCH",
        };
        f.write_str(s)
    }
}

/// Verifies signatures on behalf of organizations.
#[derive(Debug, Clone)]
pub struct VerificationService {
    registry: Arc<KeyRegistry>,
}

impl VerificationService {
    /// Create a verification service over a registry.
    pub fn new(registry: Arc<KeyRegistry>) -> Self {
        Self { registry }
    }

    /// Check a decoded signature over `bytes`.
    pub fn check(
        &self,
        org: &OrganizationRef,
        bytes: &[u8],
        signature: &OrgSignature,
    ) -> VerificationOutcome {
        let outcome = Self::check_with(self.registry.public_key(org), bytes, signature);
        debug!(organization = %org, %outcome, "checked signature");
        outcome
    }

    /// Check a base64 signature against a directory row's key.
    pub fn check_for_entry(
        &self,
        entry: &OrganizationEntry,
        bytes: &[u8],
        signature_base64: &str,
    ) -> VerificationOutcome {
        let signature = match OrgSignature::from_base64(signature_base64) {
            Ok(signature) => signature,
            Err(_) => return VerificationOutcome::MalformedSignature,
        };
        let outcome = Self::check_with(self.registry.public_key_for(entry), bytes, &signature);
        debug!(organization = %entry.key(), %outcome, "checked signature");
        outcome
    }

    fn check_with(
        public_key: Result<RsaPublicKey, RegistryError>,
        bytes: &[u8],
        signature: &OrgSignature,
    ) -> VerificationOutcome {
        let public_key = match public_key {
            Ok(key) => key,
            Err(RegistryError::KeyNotFound(_)) | Err(RegistryError::UnknownOrganization(_)) => {
                return VerificationOutcome::KeyNotFound
            }
            Err(e) => {
                error!(error = %e, "public key unavailable");
                return VerificationOutcome::KeyNotFound;
            }
        };
        match public_key.verify(bytes, signature) {
            Ok(()) => VerificationOutcome::Valid,
            Err(CryptoError::MalformedSignature(_)) => VerificationOutcome::MalformedSignature,
            Err(_) => VerificationOutcome::Mismatch,
        }
    }

    /// Check a base64 signature over `bytes`.
    pub fn check_base64(
        &self,
        org: &OrganizationRef,
        bytes: &[u8],
        signature_base64: &str,
    ) -> VerificationOutcome {
        match OrgSignature::from_base64(signature_base64) {
            Ok(signature) => self.check(org, bytes, &signature),
            Err(_) => VerificationOutcome::MalformedSignature,
        }
    }

    /// Verify a decoded signature over `bytes`.
    pub fn verify(&self, org: &OrganizationRef, bytes: &[u8], signature: &OrgSignature) -> bool {
        self.check(org, bytes, signature).is_valid()
    }

    /// Verify a base64 signature over `bytes`.
    pub fn verify_base64(&self, org: &OrganizationRef, bytes: &[u8], signature_base64: &str) -> bool {
        self.check_base64(org, bytes, signature_base64).is_valid()
    }

    /// Verify a base64 signature over canonical bytes.
    pub fn verify_canonical(
        &self,
        org: &OrganizationRef,
        data: &CanonicalBytes,
        signature_base64: &str,
    ) -> bool {
        self.verify_base64(org, data.as_bytes(), signature_base64)
    }

    /// Check a base64 signature over a credential tuple.
    pub fn check_credentials(
        &self,
        org: &OrganizationRef,
        message: &CredentialMessage,
        signature_base64: &str,
    ) -> VerificationOutcome {
        self.check_base64(org, message.as_bytes(), signature_base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::registry;
    use crate::signing::SigningService;
    use serde_json::json;

    fn org(s: &str) -> OrganizationRef {
        OrganizationRef::any(s).unwrap()
    }

    fn services() -> (SigningService, VerificationService) {
        let registry = registry();
        (
            SigningService::new(Arc::clone(&registry)),
            VerificationService::new(registry),
        )
    }

    #[test]
    fn test_roundtrip() {
        let (signer, verifier) = services();
        let sig = signer.sign(&org("ACME-001"), b"message").unwrap();
        assert_eq!(
            verifier.check(&org("ACME-001"), b"message", &sig),
            VerificationOutcome::Valid
        );
        assert!(verifier.verify_base64(&org("acme corp"), b"message", &sig.to_base64()));
    }

    #[test]
    fn test_tamper_sensitivity() {
        let (signer, verifier) = services();
        let sig = signer.sign(&org("ACME-001"), b"m2").unwrap();
        assert_eq!(
            verifier.check(&org("ACME-001"), b"m1", &sig),
            VerificationOutcome::Mismatch
        );
    }

    #[test]
    fn test_missing_key_is_false_not_error() {
        let (signer, verifier) = services();
        let sig = signer.sign(&org("ACME-001"), b"m").unwrap();
        assert_eq!(
            verifier.check(&org("Initech"), b"m", &sig),
            VerificationOutcome::KeyNotFound
        );
        assert!(!verifier.verify(&org("Nobody"), b"m", &sig));
    }

    #[test]
    fn test_malformed_signatures() {
        let (_, verifier) = services();
        assert_eq!(
            verifier.check_base64(&org("ACME-001"), b"m", "%%%"),
            VerificationOutcome::MalformedSignature
        );
        assert_eq!(
            verifier.check_base64(&org("ACME-001"), b"m", "AQID"),
            VerificationOutcome::MalformedSignature
        );
        assert_eq!(
            verifier.check_base64(&org("ACME-001"), b"m", ""),
            VerificationOutcome::MalformedSignature
        );
    }

    #[test]
    fn test_acme_scenario_flipped_character() {
        let (signer, verifier) = services();
        let payload = CanonicalBytes::new(&json!({"course": "X", "grade": "A"})).unwrap();
        assert_eq!(payload.as_str(), r#"{"course":"X","grade":"A"}"#);
        let sig = signer.sign_canonical(&org("ACME-001"), &payload).unwrap().to_base64();
        assert!(verifier.verify_canonical(&org("ACME-001"), &payload, &sig));

        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'Q' { 'R' } else { 'Q' };
        let flipped: String = chars.into_iter().collect();
        assert!(!verifier.verify_canonical(&org("ACME-001"), &payload, &flipped));
    }

    #[test]
    fn test_check_for_entry() {
        let (signer, verifier) = services();
        let sig = signer.sign(&org("ACME-001"), b"m").unwrap().to_base64();
        let registry = registry();
        let entry = registry.resolve(&org("ACME-001")).unwrap().clone();
        assert_eq!(
            verifier.check_for_entry(&entry, b"m", &sig),
            VerificationOutcome::Valid
        );
        assert_eq!(
            verifier.check_for_entry(&entry, b"m", "!!"),
            VerificationOutcome::MalformedSignature
        );
    }

    #[test]
    fn test_credentials() {
        let (signer, verifier) = services();
        let msg = CredentialMessage::new("a@example.com", "pw");
        let sig = signer.sign_credentials(&org("ACME-001"), &msg).unwrap();
        assert!(verifier
            .check_credentials(&org("ACME-001"), &msg, &sig.to_base64())
            .is_valid());
        let other = CredentialMessage::new("a@example.com", "pw2");
        assert_eq!(
            verifier.check_credentials(&org("ACME-001"), &other, &sig.to_base64()),
            VerificationOutcome::Mismatch
        );
    }
}
