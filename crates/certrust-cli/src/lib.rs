//! # certrust-cli — Command-Line Interface
//!
//! Provides the `certrust` binary.
//!
//! ## Subcommands
//!
//! - `certrust provision` / `certrust keys show`: key custody.
//! - `certrust canonicalize`, `sign`, `verify`: raw signing primitives.
//! - `certrust credentials`, `signatures`: credential proofs and export.
//! - `certrust certificate`: the certificate lifecycle.
//!
//! ## Data directory
//!
//! ```text
//! <data-dir>/
//!   keys/               one JSON file per organization
//!   certificates.json   certificate records
//!   artifacts/          archived payloads and uploads
//! ```

pub mod certificate;
pub mod keys;
pub mod signing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use certrust_core::OrganizationRef;
use certrust_crypto::ArtifactStore;
use certrust_keys::{FileKeyStore, KeyRegistry, OrganizationDirectory, RegistryConfig};
use certrust_trust::{FileCertificateStore, TrustService};

/// Paths shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Workspace {
    data_dir: PathBuf,
    directory: PathBuf,
}

impl Workspace {
    pub fn new(data_dir: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            directory: directory.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    pub fn certificates_path(&self) -> PathBuf {
        self.data_dir.join("certificates.json")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }

    /// Load the organization directory file.
    pub fn load_directory(&self) -> Result<Arc<OrganizationDirectory>> {
        let directory = OrganizationDirectory::load(&self.directory).with_context(|| {
            format!(
                "failed to load organization directory: {}",
                self.directory.display()
            )
        })?;
        Ok(Arc::new(directory))
    }

    /// A registry over the directory and the file key store.
    pub fn registry(&self, config: RegistryConfig) -> Result<Arc<KeyRegistry>> {
        Ok(Arc::new(KeyRegistry::new(
            self.load_directory()?,
            Arc::new(FileKeyStore::new(self.keys_dir())),
            config,
        )))
    }

    /// The trust service over the file-backed stores.
    pub fn trust_service(&self) -> Result<TrustService> {
        let registry = self.registry(RegistryConfig::default())?;
        Ok(TrustService::new(
            registry,
            Arc::new(FileCertificateStore::new(self.certificates_path())),
        )
        .with_artifact_store(ArtifactStore::new(self.artifacts_dir())))
    }
}

/// Parse an organization argument (code or name).
pub fn organization_ref(raw: &str) -> Result<OrganizationRef> {
    OrganizationRef::any(raw).with_context(|| format!("invalid organization: {raw:?}"))
}

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) const DIRECTORY_JSON: &str = r#"[
        {"CIN": "ACME-001", "Name": "Acme Corp", "Status": "ACTIVE"},
        {"CIN": "GLOBEX-7", "Name": "Globex", "Status": "SUSPENDED"}
    ]"#;

    /// A workspace in a temp dir with a two-row directory and no keys.
    pub(crate) fn workspace(tmp: &Path) -> Workspace {
        let directory = tmp.join("organizations.json");
        std::fs::write(&directory, DIRECTORY_JSON).unwrap();
        Workspace::new(tmp.join("data"), directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_data_dir() {
        let ws = Workspace::new("/srv/certrust", "orgs.yaml");
        assert_eq!(ws.keys_dir(), PathBuf::from("/srv/certrust/keys"));
        assert_eq!(
            ws.certificates_path(),
            PathBuf::from("/srv/certrust/certificates.json")
        );
        assert_eq!(ws.artifacts_dir(), PathBuf::from("/srv/certrust/artifacts"));
    }

    #[test]
    fn missing_directory_has_context() {
        let ws = Workspace::new("/nonexistent", "/nonexistent/orgs.json");
        let err = ws.load_directory().unwrap_err();
        assert!(format!("{err:#}").contains("failed to load organization directory"));
    }

    #[test]
    fn blank_organization_rejected() {
        assert!(organization_ref("  ").is_err());
        assert!(organization_ref("ACME-001").is_ok());
    }
}
