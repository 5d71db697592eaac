//! # certrust-api — HTTP Service
//!
//! ## API Surface
//!
//! | Prefix                 | Module                       |
//! |------------------------|------------------------------|
//! | `/v1/organizations/*`  | [`routes::organizations`]    |
//! | `/v1/certificates/*`   | [`routes::certificates`]     |
//! | `/v1/subjects/*`       | [`routes::certificates`]     |
//! | `/v1/signatures/*`     | [`routes::signatures`]       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the application router.
///
/// Health probes are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::organizations::router())
        .merge(routes::certificates::router())
        .merge(routes::signatures::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
