//! # Integration Tests for certrust-api
//!
//! Drives the full router with `oneshot`: health probes, authentication,
//! organization lookups, payload and credential-proof submission,
//! re-verification, listing and signature export.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use certrust_api::state::{AppConfig, AppState};
use certrust_core::{CanonicalBytes, OrganizationCode, OrganizationRef};
use certrust_crypto::RsaKeyPair;
use certrust_keys::{
    CredentialMessage, KeyRegistry, KeyStore, MemoryKeyStore, OrganizationDirectory,
    RegistryConfig, StoredKeyPair,
};
use certrust_trust::{MemoryCertificateStore, TrustService};

const DIRECTORY_JSON: &str = r#"[
    {"CIN": "ACME-001", "Name": "Acme Corp", "Status": "ACTIVE", "url": "https://acme.example"},
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

/// State over in-memory stores with only ACME-001 holding a key.
fn test_state(auth_token: Option<&str>) -> AppState {
    let keys = MemoryKeyStore::new();
    keys.insert_if_absent(&OrganizationCode::new("ACME-001").unwrap(), acme_keys().clone())
        .unwrap();
    let registry = Arc::new(KeyRegistry::new(
        Arc::new(OrganizationDirectory::from_json_str(DIRECTORY_JSON).unwrap()),
        Arc::new(keys),
        RegistryConfig::default(),
    ));
    let trust = TrustService::new(registry, Arc::new(MemoryCertificateStore::new()));
    let config = AppConfig {
        auth_token: auth_token.map(str::to_string),
        ..AppConfig::default()
    };
    AppState::new(config, trust)
}

fn test_app() -> axum::Router {
    certrust_api::app(test_state(None))
}

fn acme_sign(state: &AppState, bytes: &[u8]) -> String {
    state
        .trust
        .signer()
        .sign(&OrganizationRef::any("ACME-001").unwrap(), bytes)
        .unwrap()
        .to_base64()
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

// -- Health & auth ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes_skip_auth() {
    let app = certrust_api::app(test_state(Some("s3cret")));
    let (status, body) = send(app.clone(), "GET", "/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
    let (status, body) = send(app, "GET", "/health/readiness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ready"));
}

#[tokio::test]
async fn test_api_requires_token_when_configured() {
    let app = certrust_api::app(test_state(Some("s3cret")));
    let (status, body) = send(app.clone(), "GET", "/v1/organizations/eligible", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/organizations/eligible")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Organizations ------------------------------------------------------------

#[tokio::test]
async fn test_eligible_organizations() {
    let (status, body) = send(test_app(), "GET", "/v1/organizations/eligible", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["code"], "ACME-001");
    assert_eq!(rows[0]["status"], "ACTIVE");
    assert_eq!(rows[0]["website"], "https://acme.example");
    assert_eq!(rows[1]["name"], "Initech");
}

#[tokio::test]
async fn test_public_key_lookup() {
    let (status, body) = send(test_app(), "GET", "/v1/organizations/acme%20corp/public-key", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization"], "ACME-001");
    assert_eq!(body["public_key_pem"], acme_keys().public_key_pem.as_str());

    let (status, body) = send(test_app(), "GET", "/v1/organizations/Initech/public-key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "KEY_NOT_FOUND");

    let (status, body) = send(test_app(), "GET", "/v1/organizations/nobody/public-key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// -- Certificates -------------------------------------------------------------

#[tokio::test]
async fn test_verify_upload_scenario() {
    let state = test_state(None);
    let app = certrust_api::app(state.clone());
    let payload = json!({"grade": "A", "course": "X"});
    let canonical = CanonicalBytes::new(&payload).unwrap();
    assert_eq!(canonical.as_str(), r#"{"course":"X","grade":"A"}"#);
    let signature = acme_sign(&state, canonical.as_bytes());

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/verify-upload",
        Some(json!({
            "subject_id": "student-1",
            "organization": "ACME-001",
            "course": "X",
            "payload": payload,
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["certificate"]["verified"], true);
    assert_eq!(body["certificate"]["state"], "verified");
    assert_eq!(body["outcome"], "valid");
    assert!(body["certificate"]["verified_at"].is_string());

    // One flipped character: stored, but untrusted.
    let mut flipped: Vec<char> = signature.chars().collect();
    flipped[0] = if flipped[0] == 'Q' { 'R' } else { 'Q' };
    let flipped: String = flipped.into_iter().collect();
    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/verify-upload",
        Some(json!({
            "subject_id": "student-1",
            "organization": "ACME-001",
            "payload": payload,
            "signature": flipped,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["certificate"]["verified"], false);
    assert!(body["certificate"]["verified_at"].is_null());
    assert_eq!(body["certificate"]["signature"], flipped.as_str());

    let (status, body) = send(app, "GET", "/v1/subjects/student-1/certificates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_suspended_organization_refused() {
    let app = test_app();
    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/verify-upload",
        Some(json!({
            "subject_id": "student-1",
            "organization": "GLOBEX-7",
            "payload": {"a": 1},
            "signature": "AAAA",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ORGANIZATION_NOT_ELIGIBLE");

    let (_, body) = send(app, "GET", "/v1/subjects/student-1/certificates", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, body) = send(
        test_app(),
        "POST",
        "/v1/certificates/verify-upload",
        Some(json!({"organization": "ACME-001"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_reverify_keeps_timestamp() {
    let state = test_state(None);
    let app = certrust_api::app(state.clone());
    let payload = json!({"course": "X"});
    let signature = acme_sign(&state, CanonicalBytes::new(&payload).unwrap().as_bytes());
    let (_, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/verify-upload",
        Some(json!({
            "subject_id": "s",
            "organization": "ACME-001",
            "payload": payload,
            "signature": signature,
        })),
    )
    .await;
    let id = body["certificate"]["id"].as_str().unwrap().to_string();
    let stamped = body["certificate"]["verified_at"].clone();

    let (status, body) = send(app.clone(), "POST", &format!("/v1/certificates/{id}/verify"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_verified"], true);
    assert_eq!(body["certificate"]["verified_at"], stamped);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/00000000-0000-4000-8000-000000000000/verify",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(app, "POST", "/v1/certificates/not-a-uuid/verify", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_credential_proof() {
    let state = test_state(None);
    let app = certrust_api::app(state.clone());
    let message = CredentialMessage::new("a@example.com", "hunter2");
    let signature = acme_sign(&state, message.as_bytes());

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/credential-proof",
        Some(json!({
            "subject_id": "s",
            "organization": "Acme Corp",
            "course": "Rust 101",
            "email": "a@example.com",
            "password": "hunter2",
            "signature": signature,
            "upload_base64": "AAAA",
        })),
    )
    .await;
    // No artifact store is configured in this state.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/certificates/credential-proof",
        Some(json!({
            "subject_id": "s",
            "organization": "Acme Corp",
            "email": "a@example.com",
            "password": "hunter2",
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["certificate"]["verified"], true);
    assert_eq!(body["certificate"]["kind"], "credential_proof");
    assert_eq!(body["certificate"]["payload"], json!({"email": "a@example.com"}));
    let serialized = body.to_string();
    assert!(!serialized.contains("hunter2"));

    let id = body["certificate"]["id"].as_str().unwrap().to_string();
    let (status, body) = send(app, "POST", &format!("/v1/certificates/{id}/verify"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

// -- Signatures ---------------------------------------------------------------

#[tokio::test]
async fn test_sign_endpoint() {
    let state = test_state(None);
    let app = certrust_api::app(state.clone());
    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/signatures/sign",
        Some(json!({"organization": "ACME-001", "payload": {"b": 1, "a": 2}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canonical"], r#"{"a":2,"b":1}"#);
    let signature = body["signatureBase64"].as_str().unwrap();
    assert!(state.trust.verifier().verify_base64(
        &OrganizationRef::any("ACME-001").unwrap(),
        br#"{"a":2,"b":1}"#,
        signature
    ));

    let (status, body) = send(
        app,
        "POST",
        "/v1/signatures/sign",
        Some(json!({"organization": "Initech", "payload": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "KEY_NOT_FOUND");
}

#[tokio::test]
async fn test_generate_signatures() {
    let state = test_state(None);
    let app = certrust_api::app(state.clone());
    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/signatures/generate",
        Some(json!({"email": "a@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@example.com");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["code"], "ACME-001");
    assert!(!items[0]["signatureBase64"].as_str().unwrap().is_empty());
    // Initech is eligible but unprovisioned.
    assert_eq!(items[1]["signatureBase64"], "");

    let (status, body) = send(
        app,
        "POST",
        "/v1/signatures/generate?format=lines",
        Some(json!({"email": "a@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.starts_with("Acme Corp\tACME-001\t"));
    assert!(text.ends_with("Initech\t\t"));
}

#[tokio::test]
async fn test_verify_credential_signature() {
    let state = test_state(None);
    let app = certrust_api::app(state.clone());
    let message = CredentialMessage::new("a@example.com", "pw");
    let signature = acme_sign(&state, message.as_bytes());

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/signatures/verify",
        Some(json!({
            "organization": "ACME-001",
            "email": "a@example.com",
            "password": "pw",
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, body) = send(
        app,
        "POST",
        "/v1/signatures/verify",
        Some(json!({
            "organization": "GLOBEX-7",
            "email": "a@example.com",
            "password": "pw",
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["outcome"], "KEY_NOT_FOUND");
}
