//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from certrust-trust and certrust-keys to HTTP status
//! codes with a machine-readable code. Internal details are logged, never
//! returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use certrust_keys::SigningError;
use certrust_trust::{StoreError, TrustError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "KEY_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The organization is unknown or its status forbids issuance (400).
    #[error("{0}")]
    NotEligible(String),

    /// The payload could not be canonicalized (422).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The organization has no keypair (404).
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body or path could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotEligible(_) => (StatusCode::BAD_REQUEST, "ORGANIZATION_NOT_ELIGIBLE"),
            Self::Encoding(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ENCODING_ERROR"),
            Self::KeyNotFound(_) => (StatusCode::NOT_FOUND, "KEY_NOT_FOUND"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<certrust_core::ValidationError> for AppError {
    fn from(err: certrust_core::ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<SigningError> for AppError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::KeyNotFound(org) => Self::KeyNotFound(org),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TrustError> for AppError {
    fn from(err: TrustError) -> Self {
        match err {
            TrustError::OrganizationNotEligible { .. } => Self::NotEligible(err.to_string()),
            TrustError::Encoding(e) => Self::Encoding(e.to_string()),
            TrustError::NotFound(id) => Self::NotFound(format!("certificate {id}")),
            TrustError::NotReverifiable(..) => Self::Conflict(err.to_string()),
            TrustError::Signing(e) => e.into(),
            TrustError::Store(StoreError::Conflict(id)) => {
                Self::Conflict(format!("certificate {id} already exists"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
