//! # Certificate Endpoints
//!
//! - `POST /v1/certificates/verify-upload`: canonicalize a signed JSON
//!   payload, verify it against the organization's key and record it.
//! - `POST /v1/certificates/credential-proof`: dual-signature check over
//!   `email\npassword`, with an optional base64 file to archive.
//! - `POST /v1/certificates/:id/verify`: re-verify a stored record.
//! - `GET /v1/subjects/:subject/certificates`: a subject's records,
//!   newest first.
//!
//! A signature that does not verify still returns 201 with
//! `"verified": false`; only ineligible organizations, unencodable
//! payloads and storage failures are errors.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use certrust_core::{CertificateId, OrganizationRef, SubjectId};
use certrust_keys::VerificationOutcome;
use certrust_state::CertificateRecord;
use certrust_trust::{CredentialProofSubmission, PayloadSubmission};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::routes::blocking;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VerifyUploadRequest {
    pub subject_id: String,
    pub organization: String,
    #[serde(default)]
    pub course: String,
    pub payload: serde_json::Value,
    /// Base64 signature over the canonical payload.
    pub signature: String,
    #[serde(default)]
    pub archive: bool,
}

impl Validate for VerifyUploadRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("subject_id", &self.subject_id)?;
        require_non_blank("organization", &self.organization)
    }
}

#[derive(Deserialize)]
pub struct CredentialProofRequest {
    pub subject_id: String,
    pub organization: String,
    #[serde(default)]
    pub course: String,
    pub email: String,
    pub password: String,
    /// Base64 signature over `email\npassword`.
    pub signature: String,
    /// Optional base64 file contents to archive.
    #[serde(default)]
    pub upload_base64: Option<String>,
}

impl std::fmt::Debug for CredentialProofRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProofRequest")
            .field("subject_id", &self.subject_id)
            .field("organization", &self.organization)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Validate for CredentialProofRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("subject_id", &self.subject_id)?;
        require_non_blank("organization", &self.organization)?;
        require_non_blank("email", &self.email)
    }
}

/// A stored record plus its trust flag.
#[derive(Debug, Serialize)]
pub struct CertificateView {
    #[serde(flatten)]
    pub certificate: CertificateRecord,
    pub verified: bool,
}

impl From<CertificateRecord> for CertificateView {
    fn from(certificate: CertificateRecord) -> Self {
        Self {
            verified: certificate.is_verified(),
            certificate,
        }
    }
}

/// Response for submissions and re-verification.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub certificate: CertificateView,
    pub outcome: VerificationOutcome,
    /// Set by re-verification when the record was already Verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_verified: Option<bool>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/certificates/verify-upload", post(verify_upload))
        .route("/v1/certificates/credential-proof", post(credential_proof))
        .route("/v1/certificates/:id/verify", post(reverify))
        .route("/v1/subjects/:subject/certificates", get(list_for_subject))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn verify_upload(
    State(state): State<AppState>,
    body: Result<Json<VerifyUploadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerificationResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let submission = PayloadSubmission {
        subject: SubjectId::new(&req.subject_id)?,
        organization: OrganizationRef::any(&req.organization)?,
        course: req.course,
        payload: req.payload,
        signature: req.signature,
        archive: req.archive,
    };
    let result = blocking(move || Ok(state.trust.submit_signed_payload(submission)?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(VerificationResponse {
            certificate: result.record.into(),
            outcome: result.outcome,
            already_verified: None,
        }),
    ))
}

async fn credential_proof(
    State(state): State<AppState>,
    body: Result<Json<CredentialProofRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerificationResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let upload = match &req.upload_base64 {
        Some(encoded) => Some(
            BASE64
                .decode(encoded.trim())
                .map_err(|e| AppError::BadRequest(format!("upload_base64: {e}")))?,
        ),
        None => None,
    };
    let submission = CredentialProofSubmission {
        subject: SubjectId::new(&req.subject_id)?,
        organization: OrganizationRef::any(&req.organization)?,
        course: req.course,
        email: req.email,
        password: Zeroizing::new(req.password),
        signature: req.signature,
        upload,
    };
    let result = blocking(move || Ok(state.trust.submit_credential_proof(submission)?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(VerificationResponse {
            certificate: result.record.into(),
            outcome: result.outcome,
            already_verified: None,
        }),
    ))
}

async fn reverify(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VerificationResponse>, AppError> {
    let id = CertificateId::parse(&id)?;
    let result = blocking(move || Ok(state.trust.reverify(id)?)).await?;
    let already_verified = result
        .mark
        .map(|m| matches!(m, certrust_state::MarkOutcome::AlreadyVerified { .. }));
    Ok(Json(VerificationResponse {
        certificate: result.record.into(),
        outcome: result.outcome,
        already_verified,
    }))
}

async fn list_for_subject(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<Vec<CertificateView>>, AppError> {
    let subject = SubjectId::new(&subject)?;
    let records = blocking(move || Ok(state.trust.certificates_for(&subject)?)).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
