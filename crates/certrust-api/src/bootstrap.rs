//! # Service Bootstrap
//!
//! Builds the application state from [`AppConfig`]:
//!
//! 1. Load the organization directory.
//! 2. Open the file key store, certificate store and artifact store under
//!    the data directory.
//! 3. When `provision_on_start` is set, ensure a keypair for every
//!    directory organization before serving. Request handling never
//!    generates keys.

use std::sync::Arc;

use certrust_crypto::ArtifactStore;
use certrust_keys::{
    DirectoryError, FileKeyStore, KeyRegistry, OrganizationDirectory, RegistryConfig,
    RegistryError,
};
use certrust_trust::{FileCertificateStore, TrustService};

use crate::state::{AppConfig, AppState};

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("organization directory: {0}")]
    Directory(#[from] DirectoryError),

    #[error("key registry: {0}")]
    Registry(#[from] RegistryError),
}

/// Build the application state from configuration.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let directory = Arc::new(OrganizationDirectory::load(&config.directory)?);
    let registry = Arc::new(KeyRegistry::new(
        directory,
        Arc::new(FileKeyStore::new(config.data_dir.join("keys"))),
        RegistryConfig::new(config.modulus_bits)?,
    ));

    if config.provision_on_start {
        let report = registry.provision_all()?;
        tracing::info!(
            generated = report.generated.len(),
            already_present = report.already_present.len(),
            "startup provisioning complete"
        );
    }

    let trust = TrustService::new(
        Arc::clone(&registry),
        Arc::new(FileCertificateStore::new(
            config.data_dir.join("certificates.json"),
        )),
    )
    .with_artifact_store(ArtifactStore::new(config.data_dir.join("artifacts")));

    tracing::info!(
        organizations = registry.directory().len(),
        eligible = registry.directory().eligible().count(),
        data_dir = %config.data_dir.display(),
        auth = config.auth_token.is_some(),
        "certrust bootstrapped"
    );
    Ok(AppState::new(config, trust))
}
