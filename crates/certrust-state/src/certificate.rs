//! # Certificate Lifecycle
//!
//! ## States
//!
//! ```text
//! Unverified ──▶ Verified (terminal; verified_at stamped once)
//!     │
//!     └── failed check: stays Unverified
//! ```
//!
//! Each record names exactly one issuing organization by its registry key.
//! One organization keypair may back many certificates.

use certrust_core::{CertificateId, OrganizationCode, SubjectId, Timestamp};
use certrust_crypto::ArtifactRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ─── State ───────────────────────────────────────────────────────────

/// Trust state of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateState {
    /// Stored, but its signature has not verified.
    Unverified,
    /// Its signature verified at least once (terminal).
    Verified,
}

impl std::fmt::Display for CertificateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => f.write_str("UNVERIFIED"),
            Self::Verified => f.write_str("VERIFIED"),
        }
    }
}

/// How the certificate's signature was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateKind {
    /// An externally signed structured payload, verified over its
    /// canonical bytes.
    SignedPayload,
    /// A dual-signature proof over a credential tuple.
    CredentialProof,
}

impl std::fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignedPayload => f.write_str("SIGNED_PAYLOAD"),
            Self::CredentialProof => f.write_str("CREDENTIAL_PROOF"),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised when loading a stored record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// The stored state and timestamp disagree.
    #[error("certificate {id} is inconsistent: {reason}")]
    Inconsistent {
        /// Record identifier.
        id: String,
        /// What is wrong.
        reason: &'static str,
    },
}

// ─── Draft ───────────────────────────────────────────────────────────

/// Everything a submission supplies before the record exists.
#[derive(Debug, Clone)]
pub struct CertificateDraft {
    /// Owner of the certificate.
    pub subject: SubjectId,
    /// Registry key of the issuing organization.
    pub organization: OrganizationCode,
    /// Free-text course or claim label.
    pub course: String,
    /// Submission kind.
    pub kind: CertificateKind,
    /// The payload as submitted.
    pub payload: Value,
    /// The signature as submitted (base64, possibly malformed).
    pub signature: String,
    /// Archived artifact, if any.
    pub artifact: Option<ArtifactRef>,
}

/// Result of [`CertificateRecord::mark_verified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The record moved from Unverified to Verified.
    Transitioned {
        /// The newly stamped time.
        verified_at: Timestamp,
    },
    /// The record was already Verified; nothing changed.
    AlreadyVerified {
        /// The original stamp, unchanged.
        verified_at: Timestamp,
    },
}

impl MarkOutcome {
    /// The verification time in effect after the call.
    pub fn verified_at(&self) -> Timestamp {
        match self {
            Self::Transitioned { verified_at } | Self::AlreadyVerified { verified_at } => {
                *verified_at
            }
        }
    }
}

// ─── Record ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CertificateRecordRepr {
    id: CertificateId,
    subject: SubjectId,
    organization: OrganizationCode,
    course: String,
    kind: CertificateKind,
    payload: Value,
    signature: String,
    state: CertificateState,
    verified_at: Option<Timestamp>,
    artifact: Option<ArtifactRef>,
    created_at: Timestamp,
}

/// A stored certificate with its trust state.
///
/// `state` and `verified_at` are private: the only way to change them is
/// [`CertificateRecord::mark_verified`], which never moves a record back
/// to Unverified and never overwrites the first timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CertificateRecordRepr")]
pub struct CertificateRecord {
    id: CertificateId,
    subject: SubjectId,
    organization: OrganizationCode,
    course: String,
    kind: CertificateKind,
    payload: Value,
    signature: String,
    state: CertificateState,
    verified_at: Option<Timestamp>,
    artifact: Option<ArtifactRef>,
    created_at: Timestamp,
}

impl TryFrom<CertificateRecordRepr> for CertificateRecord {
    type Error = CertificateError;

    fn try_from(r: CertificateRecordRepr) -> Result<Self, Self::Error> {
        let consistent = matches!(
            (r.state, r.verified_at),
            (CertificateState::Unverified, None) | (CertificateState::Verified, Some(_))
        );
        if !consistent {
            return Err(CertificateError::Inconsistent {
                id: r.id.to_string(),
                reason: "verified_at must be set exactly when state is verified",
            });
        }
        Ok(Self {
            id: r.id,
            subject: r.subject,
            organization: r.organization,
            course: r.course,
            kind: r.kind,
            payload: r.payload,
            signature: r.signature,
            state: r.state,
            verified_at: r.verified_at,
            artifact: r.artifact,
            created_at: r.created_at,
        })
    }
}

impl CertificateRecord {
    /// Create a record from a draft. Records always start Unverified.
    pub fn new(draft: CertificateDraft, created_at: Timestamp) -> Self {
        Self {
            id: CertificateId::new(),
            subject: draft.subject,
            organization: draft.organization,
            course: draft.course,
            kind: draft.kind,
            payload: draft.payload,
            signature: draft.signature,
            state: CertificateState::Unverified,
            verified_at: None,
            artifact: draft.artifact,
            created_at,
        }
    }

    /// Create a record from a draft and the result of its first check.
    ///
    /// A successful check stamps `now` as the verification time.
    pub fn submit(draft: CertificateDraft, verified: bool, now: Timestamp) -> Self {
        let mut record = Self::new(draft, now);
        if verified {
            record.mark_verified(now);
        }
        record
    }

    /// Compare-and-set Unverified → Verified.
    ///
    /// The first call stamps `at`. Later calls leave the original stamp in
    /// place and report it.
    pub fn mark_verified(&mut self, at: Timestamp) -> MarkOutcome {
        match (self.state, self.verified_at) {
            (CertificateState::Verified, Some(verified_at)) => {
                MarkOutcome::AlreadyVerified { verified_at }
            }
            _ => {
                self.state = CertificateState::Verified;
                self.verified_at = Some(at);
                MarkOutcome::Transitioned { verified_at: at }
            }
        }
    }

    /// Record identifier.
    pub fn id(&self) -> CertificateId {
        self.id
    }

    /// Owner of the certificate.
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Registry key of the issuing organization.
    pub fn organization(&self) -> &OrganizationCode {
        &self.organization
    }

    /// Course or claim label.
    pub fn course(&self) -> &str {
        &self.course
    }

    /// Submission kind.
    pub fn kind(&self) -> CertificateKind {
        self.kind
    }

    /// The payload as submitted.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The signature as submitted.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Current trust state.
    pub fn state(&self) -> CertificateState {
        self.state
    }

    /// Whether the record is Verified.
    pub fn is_verified(&self) -> bool {
        self.state == CertificateState::Verified
    }

    /// Time of the first successful verification.
    pub fn verified_at(&self) -> Option<Timestamp> {
        self.verified_at
    }

    /// Archived artifact pointer.
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    /// Creation time.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> CertificateDraft {
        CertificateDraft {
            subject: SubjectId::new("user-1").unwrap(),
            organization: OrganizationCode::new("ACME-001").unwrap(),
            course: "Rust 101".into(),
            kind: CertificateKind::SignedPayload,
            payload: json!({"course": "X", "grade": "A"}),
            signature: "c2ln".into(),
            artifact: None,
        }
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    #[test]
    fn test_new_record_is_unverified() {
        let record = CertificateRecord::new(draft(), ts(100));
        assert_eq!(record.state(), CertificateState::Unverified);
        assert!(record.verified_at().is_none());
        assert_eq!(record.created_at(), ts(100));
    }

    #[test]
    fn test_submit_verified_stamps_now() {
        let record = CertificateRecord::submit(draft(), true, ts(100));
        assert!(record.is_verified());
        assert_eq!(record.verified_at(), Some(ts(100)));
    }

    #[test]
    fn test_submit_unverified_keeps_signature() {
        let record = CertificateRecord::submit(draft(), false, ts(100));
        assert!(!record.is_verified());
        assert_eq!(record.signature(), "c2ln");
    }

    #[test]
    fn test_mark_verified_is_monotonic() {
        let mut record = CertificateRecord::new(draft(), ts(100));
        assert_eq!(
            record.mark_verified(ts(200)),
            MarkOutcome::Transitioned { verified_at: ts(200) }
        );
        assert_eq!(
            record.mark_verified(ts(300)),
            MarkOutcome::AlreadyVerified { verified_at: ts(200) }
        );
        assert_eq!(record.verified_at(), Some(ts(200)));
        assert_eq!(record.state(), CertificateState::Verified);
    }

    #[test]
    fn test_serde_roundtrip() {
        let record = CertificateRecord::submit(draft(), true, ts(100));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "verified");
        assert_eq!(json["kind"], "signed_payload");
        assert_eq!(json["organization"], "ACME-001");
        let back: CertificateRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_state() {
        let record = CertificateRecord::new(draft(), ts(100));
        let mut json = serde_json::to_value(&record).unwrap();
        json["state"] = json!("verified");
        assert!(serde_json::from_value::<CertificateRecord>(json).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CertificateState::Verified.to_string(), "VERIFIED");
        assert_eq!(CertificateKind::CredentialProof.to_string(), "CREDENTIAL_PROOF");
    }
}
