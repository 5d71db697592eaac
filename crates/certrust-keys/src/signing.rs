//! # Signing Service
//!
//! Signs bytes with an organization's private key. Nothing is persisted.
//!
//! ## Credential proofs
//!
//! [`CredentialMessage`] is the fixed two-line encoding `email\npassword`
//! (UTF-8). A signature over it shows only that the organization's key can
//! regenerate the same signature for these credentials. It is not password
//! authentication: there is no salt and no nonce, and anyone holding the
//! credentials plus a valid signature can replay it.

use std::sync::Arc;

use certrust_core::{CanonicalBytes, OrganizationRef};
use certrust_crypto::OrgSignature;
use tracing::debug;
use zeroize::Zeroizing;

use crate::directory::OrganizationEntry;
use crate::error::SigningError;
use crate::registry::KeyRegistry;

/// The `email\npassword` message signed by credential proofs.
///
/// The encoded bytes are wiped on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct CredentialMessage {
    email: String,
    bytes: Zeroizing<Vec<u8>>,
}

impl CredentialMessage {
    /// Encode a credential tuple.
    pub fn new(email: &str, password: &str) -> Self {
        let mut bytes = Vec::with_capacity(email.len() + 1 + password.len());
        bytes.extend_from_slice(email.as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(password.as_bytes());
        Self {
            email: email.to_string(),
            bytes: Zeroizing::new(bytes),
        }
    }

    /// The email half.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The encoded message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for CredentialMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialMessage")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signs on behalf of organizations.
#[derive(Debug, Clone)]
pub struct SigningService {
    registry: Arc<KeyRegistry>,
}

impl SigningService {
    /// Create a signing service over a registry.
    pub fn new(registry: Arc<KeyRegistry>) -> Self {
        Self { registry }
    }

    /// Sign arbitrary bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::KeyNotFound`] when the organization is
    /// unknown or unprovisioned. Keys are never generated here.
    pub fn sign(&self, org: &OrganizationRef, bytes: &[u8]) -> Result<OrgSignature, SigningError> {
        let keypair = self.registry.signing_key(org)?;
        let signature = keypair.sign(bytes)?;
        debug!(organization = %org, len = bytes.len(), "signed message");
        Ok(signature)
    }

    /// Sign a directory row's keypair over arbitrary bytes.
    pub fn sign_for_entry(
        &self,
        entry: &OrganizationEntry,
        bytes: &[u8],
    ) -> Result<OrgSignature, SigningError> {
        let keypair = self.registry.signing_key_for(entry)?;
        Ok(keypair.sign(bytes)?)
    }

    /// Sign canonical bytes.
    pub fn sign_canonical(
        &self,
        org: &OrganizationRef,
        data: &CanonicalBytes,
    ) -> Result<OrgSignature, SigningError> {
        self.sign(org, data.as_bytes())
    }

    /// Sign a credential tuple.
    pub fn sign_credentials(
        &self,
        org: &OrganizationRef,
        message: &CredentialMessage,
    ) -> Result<OrgSignature, SigningError> {
        self.sign(org, message.as_bytes())
    }

    /// The registry backing this service.
    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }
}
