//! # Trust Service
//!
//! Runs the certificate lifecycle on top of the key registry:
//!
//! 1. **Gate.** The organization must resolve to an eligible directory row.
//!    A refusal happens before canonicalization or any key access and
//!    stores nothing.
//! 2. **Check.** Canonicalize the payload and verify the supplied
//!    signature. A failed check is not an error.
//! 3. **Persist.** The record is stored Verified (stamped now) or
//!    Unverified with the attempted signature.
//!
//! Re-verification never lowers trust: a failed re-check leaves the record
//! untouched, and a successful one keeps the first verification time.

use std::sync::Arc;

use certrust_core::{canonicalize, CertificateId, OrganizationRef, SubjectId, Timestamp};
use certrust_crypto::{ArtifactRef, ArtifactStore};
use certrust_keys::{
    CredentialMessage, KeyRegistry, OrganizationEntry, SigningError, SigningService,
    VerificationOutcome, VerificationService,
};
use certrust_state::{CertificateDraft, CertificateKind, CertificateRecord, MarkOutcome};
use serde_json::{json, Value};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::TrustError;
use crate::store::CertificateStore;

/// Artifact kind for archived canonical payloads.
pub const PAYLOAD_ARTIFACT: &str = "payload";
/// Artifact kind for files uploaded with a credential proof.
pub const UPLOAD_ARTIFACT: &str = "upload";

/// A signed JSON payload submitted for verification.
#[derive(Debug, Clone)]
pub struct PayloadSubmission {
    /// Who the certificate belongs to.
    pub subject: SubjectId,
    /// The issuing organization, by code or display name.
    pub organization: OrganizationRef,
    /// Free-text course or claim label.
    pub course: String,
    /// The JSON value as submitted; stored unchanged.
    pub payload: Value,
    /// Base64 signature over the canonical payload.
    pub signature: String,
    /// Archive the canonical bytes so later re-verification does not
    /// depend on re-encoding the stored payload.
    pub archive: bool,
}

/// A credential proof: the organization re-signs `email\npassword` and the
/// supplied signature must verify over the same message.
#[derive(Clone)]
pub struct CredentialProofSubmission {
    /// Who the certificate belongs to.
    pub subject: SubjectId,
    /// The issuing organization, by code or display name.
    pub organization: OrganizationRef,
    /// Free-text course or claim label.
    pub course: String,
    /// First line of the credential message. Stored as the payload.
    pub email: String,
    /// Second line of the credential message. Never stored.
    pub password: Zeroizing<String>,
    /// Base64 signature over the credential message.
    pub signature: String,
    /// Optional uploaded file to archive with the record.
    pub upload: Option<Vec<u8>>,
}

impl std::fmt::Debug for CredentialProofSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProofSubmission")
            .field("subject", &self.subject)
            .field("organization", &self.organization)
            .field("course", &self.course)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("upload_len", &self.upload.as_ref().map(Vec::len))
            .finish()
    }
}

/// The stored record and why its check came out the way it did.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The record as persisted.
    pub record: CertificateRecord,
    /// Result of the signature check.
    pub outcome: VerificationOutcome,
}

impl Submission {
    /// Whether the record was stored Verified.
    pub fn is_trusted(&self) -> bool {
        self.record.is_verified()
    }
}

/// Result of re-checking a stored record.
#[derive(Debug, Clone)]
pub struct Reverification {
    /// The record after the check; unchanged when the check failed.
    pub record: CertificateRecord,
    /// Result of the signature check.
    pub outcome: VerificationOutcome,
    /// Present only when the check succeeded.
    pub mark: Option<MarkOutcome>,
}

/// The certificate trust service.
#[derive(Debug, Clone)]
pub struct TrustService {
    registry: Arc<KeyRegistry>,
    signer: SigningService,
    verifier: VerificationService,
    store: Arc<dyn CertificateStore>,
    artifacts: Option<ArtifactStore>,
}

impl TrustService {
    /// Create a service over a registry and a certificate store.
    pub fn new(registry: Arc<KeyRegistry>, store: Arc<dyn CertificateStore>) -> Self {
        Self {
            signer: SigningService::new(Arc::clone(&registry)),
            verifier: VerificationService::new(Arc::clone(&registry)),
            registry,
            store,
            artifacts: None,
        }
    }

    /// Enable artifact archiving.
    pub fn with_artifact_store(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    pub fn signer(&self) -> &SigningService {
        &self.signer
    }

    pub fn verifier(&self) -> &VerificationService {
        &self.verifier
    }

    pub fn store(&self) -> &Arc<dyn CertificateStore> {
        &self.store
    }

    /// Directory rows whose status permits issuance.
    pub fn eligible_organizations(&self) -> Vec<OrganizationEntry> {
        self.registry.directory().eligible().cloned().collect()
    }

    fn gate(&self, org: &OrganizationRef) -> Result<OrganizationEntry, TrustError> {
        match self.registry.directory().check_eligibility(org) {
            Ok(entry) => Ok(entry.clone()),
            Err(e) => {
                warn!(organization = %org, reason = %e, "submission refused");
                Err(TrustError::OrganizationNotEligible {
                    organization: org.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn archive(&self, kind: &str, bytes: &[u8]) -> Result<ArtifactRef, TrustError> {
        let artifacts = self.artifacts.as_ref().ok_or_else(|| {
            TrustError::Artifact(certrust_crypto::CryptoError::Artifact(
                "no artifact store configured".into(),
            ))
        })?;
        Ok(artifacts.store(kind, bytes)?)
    }

    fn persist(
        &self,
        draft: CertificateDraft,
        outcome: VerificationOutcome,
    ) -> Result<Submission, TrustError> {
        let record = CertificateRecord::submit(draft, outcome.is_valid(), Timestamp::now());
        let record = self.store.insert(record)?;
        info!(
            certificate_id = %record.id(),
            organization = %record.organization(),
            kind = %record.kind(),
            %outcome,
            state = %record.state(),
            "certificate recorded"
        );
        Ok(Submission { record, outcome })
    }

    /// Gate, canonicalize, verify and persist a signed payload.
    ///
    /// # Errors
    ///
    /// - [`TrustError::OrganizationNotEligible`] before any other work.
    /// - [`TrustError::Encoding`] when the payload cannot be canonicalized.
    /// - [`TrustError::Artifact`] / [`TrustError::Store`] on storage failure.
    ///
    /// A signature that does not verify yields an Unverified record, not
    /// an error.
    pub fn submit_signed_payload(
        &self,
        submission: PayloadSubmission,
    ) -> Result<Submission, TrustError> {
        let entry = self.gate(&submission.organization)?;
        let canonical = canonicalize(&submission.payload)?;
        let outcome = self
            .verifier
            .check_for_entry(&entry, canonical.as_bytes(), &submission.signature);
        let artifact = if submission.archive {
            Some(self.archive(PAYLOAD_ARTIFACT, canonical.as_bytes())?)
        } else {
            None
        };
        self.persist(
            CertificateDraft {
                subject: submission.subject,
                organization: entry.key().clone(),
                course: submission.course,
                kind: CertificateKind::SignedPayload,
                payload: submission.payload,
                signature: submission.signature,
                artifact,
            },
            outcome,
        )
    }

    /// Gate, then run the dual-signature credential check and persist.
    ///
    /// The organization's own key must re-sign the credential message and
    /// the supplied signature must verify over it. A missing key makes the
    /// record untrusted; any other signing failure is an error.
    pub fn submit_credential_proof(
        &self,
        submission: CredentialProofSubmission,
    ) -> Result<Submission, TrustError> {
        let entry = self.gate(&submission.organization)?;
        let message = CredentialMessage::new(&submission.email, &submission.password);

        let own_signature = match self.signer.sign_for_entry(&entry, message.as_bytes()) {
            Ok(_) => true,
            Err(SigningError::KeyNotFound(org)) => {
                warn!(organization = %org, "no keypair; credential proof untrusted");
                false
            }
            Err(e) => return Err(e.into()),
        };
        let outcome = if own_signature {
            self.verifier
                .check_for_entry(&entry, message.as_bytes(), &submission.signature)
        } else {
            VerificationOutcome::KeyNotFound
        };

        let artifact = match &submission.upload {
            Some(bytes) => Some(self.archive(UPLOAD_ARTIFACT, bytes)?),
            None => None,
        };
        self.persist(
            CertificateDraft {
                subject: submission.subject,
                organization: entry.key().clone(),
                course: submission.course,
                kind: CertificateKind::CredentialProof,
                payload: json!({ "email": submission.email }),
                signature: submission.signature,
                artifact,
            },
            outcome,
        )
    }

    /// Re-check a stored signed-payload record.
    ///
    /// The signed bytes come from the archived artifact when there is one,
    /// otherwise from re-canonicalizing the stored payload. On success the
    /// record is marked Verified unless it already was.
    ///
    /// # Errors
    ///
    /// - [`TrustError::NotFound`] for an unknown identifier.
    /// - [`TrustError::NotReverifiable`] for credential proofs.
    /// - [`TrustError::Artifact`] when the archived bytes fail their
    ///   integrity check.
    pub fn reverify(&self, id: CertificateId) -> Result<Reverification, TrustError> {
        let record = self.store.fetch(id)?.ok_or(TrustError::NotFound(id))?;
        if record.kind() == CertificateKind::CredentialProof {
            return Err(TrustError::NotReverifiable(id, "credential passwords are not retained"));
        }

        let bytes = self.signed_bytes(&record)?;
        let outcome = match self.registry.directory().find_by_key(record.organization()) {
            Some(entry) => self.verifier.check_for_entry(entry, &bytes, record.signature()),
            None => VerificationOutcome::KeyNotFound,
        };

        if !outcome.is_valid() {
            info!(certificate_id = %id, %outcome, "re-verification did not succeed");
            return Ok(Reverification {
                record,
                outcome,
                mark: None,
            });
        }

        let (record, mark) = self.store.mark_verified(id, Timestamp::now())?;
        match mark {
            MarkOutcome::Transitioned { verified_at } => {
                info!(certificate_id = %id, %verified_at, "certificate verified");
            }
            MarkOutcome::AlreadyVerified { verified_at } => {
                info!(certificate_id = %id, %verified_at, "certificate already verified");
            }
        }
        Ok(Reverification {
            record,
            outcome,
            mark: Some(mark),
        })
    }

    fn signed_bytes(&self, record: &CertificateRecord) -> Result<Vec<u8>, TrustError> {
        if let (Some(artifact), Some(artifacts)) = (record.artifact(), self.artifacts.as_ref()) {
            if let Some(bytes) = artifacts.resolve(artifact)? {
                return Ok(bytes);
            }
            warn!(
                certificate_id = %record.id(),
                artifact = %artifact.digest,
                "archived payload missing; re-encoding stored payload"
            );
        }
        Ok(canonicalize(record.payload())?.into_bytes())
    }

    /// All records of a subject, newest first.
    pub fn certificates_for(&self, subject: &SubjectId) -> Result<Vec<CertificateRecord>, TrustError> {
        Ok(self.store.list_for_subject(subject)?)
    }

    /// Fetch one record.
    pub fn certificate(&self, id: CertificateId) -> Result<CertificateRecord, TrustError> {
        self.store.fetch(id)?.ok_or(TrustError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileCertificateStore, MemoryCertificateStore};
    use certrust_core::{CanonicalBytes, OrganizationCode};
    use certrust_crypto::RsaKeyPair;
    use certrust_keys::{
        KeyStore, MemoryKeyStore, OrganizationDirectory, RegistryConfig, StoredKeyPair,
    };
    use certrust_state::CertificateState;
    use std::sync::OnceLock;

    const DIRECTORY_JSON: &str = r#"[
        {"CIN": "ACME-001", "Name": "Acme Corp", "Status": "ACTIVE"},
        {"CIN": "GLOBEX-7", "Name": "Globex", "Status": "SUSPENDED"},
        {"CIN": "", "Name": "Initech", "Status": "approved"}
    ]"#;

    fn acme_keys() -> &'static StoredKeyPair {
        static KEYS: OnceLock<StoredKeyPair> = OnceLock::new();
        KEYS.get_or_init(|| {
            let keypair = RsaKeyPair::generate(2048).unwrap();
            StoredKeyPair {
                public_key_pem: keypair.public_key().to_spki_pem().unwrap(),
                private_key_pem: keypair.to_pkcs8_pem().unwrap(),
            }
        })
    }

    fn registry() -> Arc<KeyRegistry> {
        let keys = MemoryKeyStore::new();
        keys.insert_if_absent(&OrganizationCode::new("ACME-001").unwrap(), acme_keys().clone())
            .unwrap();
        Arc::new(KeyRegistry::new(
            Arc::new(OrganizationDirectory::from_json_str(DIRECTORY_JSON).unwrap()),
            Arc::new(keys),
            RegistryConfig::default(),
        ))
    }

    fn service() -> TrustService {
        TrustService::new(registry(), Arc::new(MemoryCertificateStore::new()))
    }

    fn org(s: &str) -> OrganizationRef {
        OrganizationRef::any(s).unwrap()
    }

    fn subject() -> SubjectId {
        SubjectId::new("student-1").unwrap()
    }

    fn sign(service: &TrustService, payload: &Value) -> String {
        let canonical = CanonicalBytes::new(payload).unwrap();
        service
            .signer()
            .sign_canonical(&org("ACME-001"), &canonical)
            .unwrap()
            .to_base64()
    }

    fn payload_submission(payload: Value, signature: String) -> PayloadSubmission {
        PayloadSubmission {
            subject: subject(),
            organization: org("ACME-001"),
            course: "X".into(),
            payload,
            signature,
            archive: false,
        }
    }

    fn flip_first(sig: &str) -> String {
        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'Q' { 'R' } else { 'Q' };
        chars.into_iter().collect()
    }

    #[test]
    fn acme_payload_verifies() {
        let service = service();
        let payload = json!({"grade": "A", "course": "X"});
        let sig = sign(&service, &payload);
        let result = service
            .submit_signed_payload(payload_submission(payload, sig))
            .unwrap();
        assert_eq!(result.outcome, VerificationOutcome::Valid);
        assert!(result.is_trusted());
        assert_eq!(result.record.verified_at(), Some(result.record.created_at()));
        assert_eq!(result.record.organization().as_str(), "ACME-001");
    }

    #[test]
    fn flipped_signature_is_stored_unverified() {
        let service = service();
        let payload = json!({"course": "X", "grade": "A"});
        let sig = flip_first(&sign(&service, &payload));
        let result = service
            .submit_signed_payload(payload_submission(payload, sig.clone()))
            .unwrap();
        assert!(!result.is_trusted());
        assert_eq!(result.record.state(), CertificateState::Unverified);
        assert_eq!(result.record.signature(), sig);
        assert!(service.certificate(result.record.id()).is_ok());
    }

    #[test]
    fn suspended_organization_is_refused_and_nothing_stored() {
        let service = service();
        let mut submission = payload_submission(json!({"a": 1}), "AAAA".into());
        submission.organization = org("globex");
        let err = service.submit_signed_payload(submission).unwrap_err();
        assert!(matches!(err, TrustError::OrganizationNotEligible { .. }));
        assert!(service.certificates_for(&subject()).unwrap().is_empty());
    }

    #[test]
    fn unknown_organization_is_refused() {
        let service = service();
        let mut submission = payload_submission(json!({"a": 1}), "AAAA".into());
        submission.organization = org("Nobody Ltd");
        assert!(matches!(
            service.submit_signed_payload(submission),
            Err(TrustError::OrganizationNotEligible { .. })
        ));
    }

    #[test]
    fn eligible_without_key_is_stored_unverified() {
        let service = service();
        let mut submission = payload_submission(json!({"a": 1}), "AAAA".into());
        submission.organization = org("initech");
        let result = service.submit_signed_payload(submission).unwrap();
        assert_eq!(result.outcome, VerificationOutcome::KeyNotFound);
        assert_eq!(result.record.organization().as_str(), "NAME:INITECH");
    }

    #[test]
    fn reverify_keeps_first_timestamp() {
        let service = service();
        let payload = json!({"course": "X", "grade": "A"});
        let sig = sign(&service, &payload);
        let first = service
            .submit_signed_payload(payload_submission(payload, sig))
            .unwrap();
        let stamped = first.record.verified_at();

        let again = service.reverify(first.record.id()).unwrap();
        assert!(again.outcome.is_valid());
        assert!(matches!(again.mark, Some(MarkOutcome::AlreadyVerified { .. })));
        assert_eq!(again.record.verified_at(), stamped);
    }

    #[test]
    fn failed_reverify_leaves_record_untouched() {
        let service = service();
        let payload = json!({"course": "X"});
        let sig = flip_first(&sign(&service, &payload));
        let first = service
            .submit_signed_payload(payload_submission(payload, sig))
            .unwrap();
        let again = service.reverify(first.record.id()).unwrap();
        assert_eq!(again.outcome, VerificationOutcome::Mismatch);
        assert!(again.mark.is_none());
        assert_eq!(again.record, first.record);
    }

    #[test]
    fn failed_recheck_keeps_verified_timestamp() {
        let store: Arc<dyn CertificateStore> = Arc::new(MemoryCertificateStore::new());
        let service = TrustService::new(registry(), Arc::clone(&store));
        let payload = json!({"course": "X"});
        let sig = sign(&service, &payload);
        let first = service
            .submit_signed_payload(payload_submission(payload, sig))
            .unwrap();
        assert!(first.is_trusted());

        // Same directory and records, but the key store lost ACME's keypair.
        let keyless = Arc::new(KeyRegistry::new(
            Arc::new(OrganizationDirectory::from_json_str(DIRECTORY_JSON).unwrap()),
            Arc::new(MemoryKeyStore::new()),
            RegistryConfig::default(),
        ));
        let degraded = TrustService::new(keyless, Arc::clone(&store));
        let again = degraded.reverify(first.record.id()).unwrap();
        assert_eq!(again.outcome, VerificationOutcome::KeyNotFound);
        assert!(again.mark.is_none());
        assert_eq!(again.record, first.record);

        let stored = store.fetch(first.record.id()).unwrap().unwrap();
        assert_eq!(stored.state(), CertificateState::Verified);
        assert_eq!(stored.verified_at(), first.record.verified_at());
    }

    #[test]
    fn reverify_unknown_id() {
        let service = service();
        let id = CertificateId::new();
        assert!(matches!(service.reverify(id), Err(TrustError::NotFound(got)) if got == id));
    }

    #[test]
    fn archived_payload_is_used_for_reverify() {
        let tmp = tempfile::tempdir().unwrap();
        let service = TrustService::new(
            registry(),
            Arc::new(FileCertificateStore::new(tmp.path().join("certificates.json"))),
        )
        .with_artifact_store(ArtifactStore::new(tmp.path().join("artifacts")));
        let payload = json!({"course": "X", "grade": "A"});
        let sig = sign(&service, &payload);
        let mut submission = payload_submission(payload, sig);
        submission.archive = true;
        let first = service.submit_signed_payload(submission).unwrap();
        let artifact = first.record.artifact().unwrap().clone();
        assert_eq!(artifact.kind.as_str(), PAYLOAD_ARTIFACT);

        let again = service.reverify(first.record.id()).unwrap();
        assert!(again.outcome.is_valid());
        assert_eq!(again.record.artifact(), Some(&artifact));
    }

    #[test]
    fn archive_without_store_is_an_error() {
        let service = service();
        let mut submission = payload_submission(json!({"a": 1}), "AAAA".into());
        submission.archive = true;
        assert!(matches!(
            service.submit_signed_payload(submission),
            Err(TrustError::Artifact(_))
        ));
    }

    fn proof(signature: String) -> CredentialProofSubmission {
        CredentialProofSubmission {
            subject: subject(),
            organization: org("ACME-001"),
            course: "Rust 101".into(),
            email: "a@example.com".into(),
            password: Zeroizing::new("hunter2".into()),
            signature,
            upload: None,
        }
    }

    #[test]
    fn credential_proof_dual_signature() {
        let service = service();
        let message = CredentialMessage::new("a@example.com", "hunter2");
        let sig = service
            .signer()
            .sign_credentials(&org("ACME-001"), &message)
            .unwrap()
            .to_base64();

        let trusted = service.submit_credential_proof(proof(sig.clone())).unwrap();
        assert!(trusted.is_trusted());
        assert_eq!(trusted.record.kind(), CertificateKind::CredentialProof);
        assert_eq!(trusted.record.payload(), &json!({"email": "a@example.com"}));

        let mut wrong_password = proof(sig);
        wrong_password.password = Zeroizing::new("hunter3".into());
        let untrusted = service.submit_credential_proof(wrong_password).unwrap();
        assert_eq!(untrusted.outcome, VerificationOutcome::Mismatch);
        assert!(!untrusted.is_trusted());
    }

    #[test]
    fn credential_proof_without_key_is_untrusted() {
        let service = service();
        let mut submission = proof("AAAA".into());
        submission.organization = org("Initech");
        let result = service.submit_credential_proof(submission).unwrap();
        assert_eq!(result.outcome, VerificationOutcome::KeyNotFound);
        assert!(!result.is_trusted());
    }

    #[test]
    fn credential_proof_is_not_reverifiable() {
        let service = service();
        let result = service.submit_credential_proof(proof("AAAA".into())).unwrap();
        assert!(matches!(
            service.reverify(result.record.id()),
            Err(TrustError::NotReverifiable(..))
        ));
    }

    #[test]
    fn credential_proof_debug_redacts_password() {
        let rendered = format!("{:?}", proof("AAAA".into()));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn listing_and_eligible_organizations() {
        let service = service();
        service
            .submit_signed_payload(payload_submission(json!({"n": 1}), "AAAA".into()))
            .unwrap();
        service
            .submit_signed_payload(payload_submission(json!({"n": 2}), "AAAA".into()))
            .unwrap();
        assert_eq!(service.certificates_for(&subject()).unwrap().len(), 2);

        let names: Vec<String> = service
            .eligible_organizations()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Acme Corp", "Initech"]);
    }
}
