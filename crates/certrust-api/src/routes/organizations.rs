//! # Organization Endpoints
//!
//! - `GET /v1/organizations/eligible`: directory rows with an eligible
//!   status, in directory order.
//! - `GET /v1/organizations/:org/public-key`: SPKI PEM of an
//!   organization's key, looked up by code or name.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use certrust_core::OrganizationRef;
use certrust_keys::{OrganizationEntry, RegistryError};

use crate::error::AppError;
use crate::routes::blocking;
use crate::state::AppState;

/// Response for the public key endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// The organization's registry key.
    pub organization: String,
    pub public_key_pem: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/organizations/eligible", get(eligible))
        .route("/v1/organizations/:org/public-key", get(public_key))
}

async fn eligible(State(state): State<AppState>) -> Json<Vec<OrganizationEntry>> {
    Json(state.trust.eligible_organizations())
}

async fn public_key(
    State(state): State<AppState>,
    Path(org): Path<String>,
) -> Result<Json<PublicKeyResponse>, AppError> {
    let org = OrganizationRef::any(&org)?;
    blocking(move || {
        let registry = state.trust.registry();
        let entry = registry
            .resolve(&org)
            .map_err(|_| AppError::NotFound(format!("organization {org}")))?;
        let keys = registry.keys_for_entry(entry).map_err(|e| match e {
            RegistryError::KeyNotFound(key) => AppError::KeyNotFound(key),
            other => AppError::Internal(other.to_string()),
        })?;
        Ok(Json(PublicKeyResponse {
            organization: entry.key().to_string(),
            public_key_pem: keys.public_key_pem,
        }))
    })
    .await
}
