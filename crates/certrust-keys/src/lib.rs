//! # certrust-keys — Organization Key Management
//!
//! - [`directory`]: the organization directory and its eligibility rule.
//! - [`store`]: the durable key store trait and its memory/file backends.
//! - [`registry`]: idempotent keypair issuance and two-phase lookup.
//! - [`signing`] / [`verification`]: RSASSA-PKCS1-v1_5 / SHA-256 over
//!   organization keys. Signing fails loudly on a missing key; verification
//!   degrades to `false`.
//! - [`export`]: per-organization credential signatures for distribution.
//!
//! Key generation is reachable only through
//! [`KeyRegistry::ensure_keypair`] and [`KeyRegistry::provision_all`].

pub mod directory;
pub mod error;
pub mod export;
pub mod registry;
pub mod signing;
pub mod store;
pub mod verification;

pub use directory::{EligibilityStatus, OrganizationDirectory, OrganizationEntry, NAME_KEY_PREFIX};
pub use error::{DirectoryError, RegistryError, SigningError};
pub use export::{CredentialSignatureExport, ExportItem};
pub use registry::{Issuance, KeyRegistry, ProvisionReport, RegistryConfig};
pub use signing::{CredentialMessage, SigningService};
pub use store::{FileKeyStore, InsertOutcome, KeyStore, KeyStoreError, MemoryKeyStore, StoredKeyPair};
pub use verification::{VerificationOutcome, VerificationService};
