//! # certrust-api — Binary Entry Point
//!
//! Reads configuration from the environment, bootstraps the stores and
//! serves the router until Ctrl-C.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use certrust_api::state::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::debug!(?config, "loaded configuration");
    let port = config.port;

    // Startup provisioning generates RSA keys; keep it off the async workers.
    let state = tokio::task::spawn_blocking(move || certrust_api::bootstrap::bootstrap(config))
        .await
        .context("bootstrap task failed")?
        .context("bootstrap failed")?;

    let app = certrust_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("certrust API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
