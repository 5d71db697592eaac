//! # Signature Endpoints
//!
//! - `POST /v1/signatures/sign`: sign the canonical encoding of a JSON
//!   payload with an organization's key.
//! - `POST /v1/signatures/generate`: sign `email\npassword` with every
//!   eligible organization's key. JSON by default, tab-separated lines
//!   with `?format=lines`.
//! - `POST /v1/signatures/verify`: check a credential signature.
//!
//! Signing fails with `KEY_NOT_FOUND` when the organization has no key;
//! verification answers `valid: false` instead.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use certrust_core::{CanonicalBytes, OrganizationRef};
use certrust_keys::{CredentialMessage, CredentialSignatureExport, VerificationOutcome};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, require_non_blank, Validate};
use crate::routes::blocking;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub organization: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub organization: String,
    pub canonical: String,
    #[serde(rename = "signatureBase64")]
    pub signature_base64: String,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Validate for GenerateRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("email", &self.email)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct CredentialVerifyRequest {
    pub organization: String,
    pub email: String,
    pub password: String,
    pub signature: String,
}

impl std::fmt::Debug for CredentialVerifyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifyRequest")
            .field("organization", &self.organization)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialVerifyResponse {
    pub valid: bool,
    pub outcome: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/signatures/sign", post(sign))
        .route("/v1/signatures/generate", post(generate))
        .route("/v1/signatures/verify", post(verify_credentials))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn sign(
    State(state): State<AppState>,
    body: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<SignResponse>, AppError> {
    let req = extract_json(body)?;
    let org = OrganizationRef::any(&req.organization)?;
    let canonical =
        CanonicalBytes::new(&req.payload).map_err(|e| AppError::Encoding(e.to_string()))?;
    blocking(move || {
        let signature = state.trust.signer().sign_canonical(&org, &canonical)?;
        Ok(Json(SignResponse {
            organization: req.organization,
            canonical: canonical.as_str().to_string(),
            signature_base64: signature.to_base64(),
        }))
    })
    .await
}

async fn generate(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = extract_validated_json(body)?;
    let lines = match query.format.as_deref() {
        None | Some("json") => false,
        Some("lines") => true,
        Some(other) => return Err(AppError::BadRequest(format!("unknown format {other:?}"))),
    };
    let password = Zeroizing::new(req.password);
    let message = CredentialMessage::new(&req.email, &password);
    let export = blocking(move || {
        let signer = state.trust.signer();
        Ok(CredentialSignatureExport::generate(
            signer,
            signer.registry().directory(),
            &message,
        )?)
    })
    .await?;

    if lines {
        Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            export.to_lines(),
        )
            .into_response())
    } else {
        Ok(Json(export).into_response())
    }
}

async fn verify_credentials(
    State(state): State<AppState>,
    body: Result<Json<CredentialVerifyRequest>, JsonRejection>,
) -> Result<Json<CredentialVerifyResponse>, AppError> {
    let req = extract_json(body)?;
    let org = OrganizationRef::any(&req.organization)?;
    let password = Zeroizing::new(req.password);
    let message = CredentialMessage::new(&req.email, &password);
    let signature = req.signature;
    let outcome: VerificationOutcome = blocking(move || {
        Ok(state
            .trust
            .verifier()
            .check_credentials(&org, &message, &signature))
    })
    .await?;
    Ok(Json(CredentialVerifyResponse {
        valid: outcome.is_valid(),
        outcome: outcome.to_string(),
    }))
}
