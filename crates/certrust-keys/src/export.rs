//! # Credential Signature Export
//!
//! Produces, for every eligible organization, the triple
//! `(name, code, signature_base64)` over one credential tuple. Two
//! renderings: tab-separated lines and a JSON document.
//!
//! An eligible organization without a keypair appears with an empty
//! signature and a warning is logged; the export never generates keys.

use serde::Serialize;
use tracing::{info, warn};

use crate::directory::OrganizationDirectory;
use crate::error::SigningError;
use crate::signing::{CredentialMessage, SigningService};

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportItem {
    /// Display name.
    pub name: String,
    /// Canonical code (may be empty).
    pub code: String,
    /// Base64 signature, empty when the organization has no keypair.
    #[serde(rename = "signatureBase64")]
    pub signature_base64: String,
}

/// The full export for one credential tuple. The password is never part
/// of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSignatureExport {
    /// The email half of the credential tuple.
    pub email: String,
    /// One item per eligible organization, in directory order.
    pub items: Vec<ExportItem>,
}

impl CredentialSignatureExport {
    /// Sign `message` with every eligible organization's key.
    ///
    /// # Errors
    ///
    /// Fails only on key store or crypto failures. A missing key yields an
    /// empty signature.
    pub fn generate(
        signer: &SigningService,
        directory: &OrganizationDirectory,
        message: &CredentialMessage,
    ) -> Result<Self, SigningError> {
        let mut items = Vec::new();
        for entry in directory.eligible() {
            let signature_base64 = match signer.sign_for_entry(entry, message.as_bytes()) {
                Ok(sig) => sig.to_base64(),
                Err(SigningError::KeyNotFound(_)) => {
                    warn!(organization = %entry.key(), "eligible organization has no keypair; exporting empty signature");
                    String::new()
                }
                Err(e) => return Err(e),
            };
            items.push(ExportItem {
                name: entry.name.clone(),
                code: entry.code.clone(),
                signature_base64,
            });
        }
        info!(count = items.len(), "generated credential signatures");
        Ok(Self {
            email: message.email().to_string(),
            items,
        })
    }

    /// Tab-separated `name\tcode\tsignature` lines joined by `\n`.
    pub fn to_lines(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{}\t{}\t{}", i.name, i.code, i.signature_base64))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pretty-printed JSON `{"email", "items": [...]}`.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
