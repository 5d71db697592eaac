//! # Error Types
//!
//! One enum per layer. A registry failure wraps store and crypto failures
//! via `#[from]`; signing maps a missing key to its own variant so callers
//! can fail loudly on it.

use certrust_core::ValidationError;
use certrust_crypto::CryptoError;
use thiserror::Error;

use crate::store::KeyStoreError;

/// Errors from loading or querying the organization directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The directory file could not be read.
    #[error("cannot read directory {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The directory file is not valid JSON.
    #[error("invalid directory JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The directory file is not valid YAML.
    #[error("invalid directory YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A row has neither a code nor a name.
    #[error("directory row has neither a code nor a name")]
    MissingIdentifier,

    /// A row is not a mapping of field names to values.
    #[error("directory row is not an object")]
    NotAnObject,

    /// A row's registry key is already taken by an earlier row.
    #[error("registry key {key} is already used by row {first_row}")]
    DuplicateKey {
        /// The colliding registry key.
        key: String,
        /// Index of the row that keeps the key.
        first_row: usize,
    },

    /// A row identifier failed validation.
    #[error("invalid organization identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    /// No row matches the requested organization.
    #[error("organization {0:?} is not in the directory")]
    UnknownOrganization(String),

    /// The row exists but its status does not permit issuance.
    #[error("organization {organization} has status {status:?}, which is not eligible")]
    Ineligible {
        /// Registry key of the organization.
        organization: String,
        /// The directory status as written.
        status: String,
    },
}

/// Errors from the key registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The organization is not in the directory, so no key may be issued.
    #[error("unknown organization {0:?}")]
    UnknownOrganization(String),

    /// The organization has no keypair yet.
    #[error("no keypair for organization {0:?}")]
    KeyNotFound(String),

    /// Invalid registry configuration.
    #[error("invalid registry configuration: {0}")]
    Config(String),

    /// Key material could not be generated or decoded.
    #[error("key material error: {0}")]
    Crypto(#[from] CryptoError),

    /// The durable key store failed.
    #[error("key store error: {0}")]
    Store(#[from] KeyStoreError),
}

/// Errors from the signing service.
#[derive(Error, Debug)]
pub enum SigningError {
    /// No keypair exists for the organization.
    #[error("no signing key for organization {0:?}")]
    KeyNotFound(String),

    /// The registry failed for another reason.
    #[error(transparent)]
    Registry(RegistryError),

    /// The RSA primitive failed.
    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<RegistryError> for SigningError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::KeyNotFound(org) | RegistryError::UnknownOrganization(org) => {
                Self::KeyNotFound(org)
            }
            other => Self::Registry(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_key_not_found_maps_to_signing_key_not_found() {
        let err = SigningError::from(RegistryError::KeyNotFound("ACME-001".into()));
        assert!(matches!(err, SigningError::KeyNotFound(ref org) if org == "ACME-001"));
    }

    #[test]
    fn registry_unknown_org_maps_to_signing_key_not_found() {
        let err = SigningError::from(RegistryError::UnknownOrganization("X".into()));
        assert!(matches!(err, SigningError::KeyNotFound(_)));
    }

    #[test]
    fn registry_config_stays_registry() {
        let err = SigningError::from(RegistryError::Config("bad".into()));
        assert!(matches!(err, SigningError::Registry(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn ineligible_display_names_status() {
        let err = DirectoryError::Ineligible {
            organization: "GLOBEX-7".into(),
            status: "suspended".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("GLOBEX-7"));
        assert!(msg.contains("suspended"));
    }
}
