//! # Key Registry
//!
//! Owns every organization keypair. Other components borrow key material
//! for a single sign or verify call and never persist it.
//!
//! ## Invariants
//!
//! - At most one keypair per organization. [`KeyRegistry::ensure_keypair`]
//!   only generates when the store has nothing for the organization, and
//!   an existing keypair is never replaced.
//! - Generation happens only on the ensure path. Lookups for signing or
//!   verification never create keys.
//! - Concurrent ensures for the same organization are serialized by a
//!   per-organization lock, and the store's `insert_if_absent` is atomic,
//!   so a losing racer discards its freshly generated key.

use std::collections::HashMap;
use std::sync::Arc;

use certrust_core::{OrganizationCode, OrganizationRef};
use certrust_crypto::{RsaKeyPair, RsaPublicKey, DEFAULT_MODULUS_BITS, MIN_MODULUS_BITS};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::directory::{OrganizationDirectory, OrganizationEntry};
use crate::error::RegistryError;
use crate::store::{InsertOutcome, KeyStore, StoredKeyPair};

/// Registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    modulus_bits: usize,
}

impl RegistryConfig {
    /// Configure the modulus size for newly generated keys.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] for sizes below 2048 bits.
    pub fn new(modulus_bits: usize) -> Result<Self, RegistryError> {
        if modulus_bits < MIN_MODULUS_BITS {
            return Err(RegistryError::Config(format!(
                "modulus_bits must be at least {MIN_MODULUS_BITS}, got {modulus_bits}"
            )));
        }
        Ok(Self { modulus_bits })
    }

    /// Modulus size for newly generated keys.
    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            modulus_bits: DEFAULT_MODULUS_BITS,
        }
    }
}

/// What `ensure_keypair` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issuance {
    /// A new keypair was generated and persisted.
    Generated,
    /// A keypair already existed and was left untouched.
    AlreadyPresent,
}

/// Outcome of provisioning the whole directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Organizations that received a new keypair.
    pub generated: Vec<OrganizationCode>,
    /// Organizations that already had one.
    pub already_present: Vec<OrganizationCode>,
}

impl ProvisionReport {
    /// Total organizations covered.
    pub fn total(&self) -> usize {
        self.generated.len() + self.already_present.len()
    }
}

/// The key registry.
pub struct KeyRegistry {
    directory: Arc<OrganizationDirectory>,
    store: Arc<dyn KeyStore>,
    config: RegistryConfig,
    locks: Mutex<HashMap<OrganizationCode, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("organizations", &self.directory.len())
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

impl KeyRegistry {
    /// Create a registry over a directory and a key store.
    pub fn new(
        directory: Arc<OrganizationDirectory>,
        store: Arc<dyn KeyStore>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            directory,
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The directory this registry issues keys for.
    pub fn directory(&self) -> &OrganizationDirectory {
        &self.directory
    }

    /// A shared handle to the directory.
    pub fn directory_handle(&self) -> Arc<OrganizationDirectory> {
        Arc::clone(&self.directory)
    }

    /// The registry configuration.
    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Resolve an organization reference against the directory.
    pub fn resolve(&self, org: &OrganizationRef) -> Result<&OrganizationEntry, RegistryError> {
        self.directory
            .resolve(org)
            .ok_or_else(|| RegistryError::UnknownOrganization(org.to_string()))
    }

    fn lock_for(&self, key: &OrganizationCode) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    /// Generate and persist a keypair for `org` unless it already has one.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownOrganization`] if `org` is not in the
    ///   directory.
    /// - [`RegistryError::Crypto`] / [`RegistryError::Store`] on generation
    ///   or persistence failure.
    pub fn ensure_keypair(&self, org: &OrganizationRef) -> Result<Issuance, RegistryError> {
        let entry = self.resolve(org)?;
        self.ensure_for_entry(entry)
    }

    /// Ensure a keypair for one directory row.
    pub fn ensure_for_entry(&self, entry: &OrganizationEntry) -> Result<Issuance, RegistryError> {
        let key = entry.key();
        let lock = self.lock_for(key);
        let _guard = lock.lock();

        if self.store.contains(key)? {
            debug!(organization = %key, "keypair already present");
            return Ok(Issuance::AlreadyPresent);
        }

        let keypair = RsaKeyPair::generate(self.config.modulus_bits)?;
        let pair = StoredKeyPair {
            public_key_pem: keypair.public_key().to_spki_pem()?,
            private_key_pem: keypair.to_pkcs8_pem()?,
        };
        match self.store.insert_if_absent(key, pair)? {
            InsertOutcome::Inserted => {
                info!(
                    organization = %key,
                    modulus_bits = self.config.modulus_bits,
                    "generated organization keypair"
                );
                Ok(Issuance::Generated)
            }
            InsertOutcome::AlreadyPresent => {
                // Another process sharing the store won the race.
                info!(organization = %key, "keypair appeared concurrently; discarding generated key");
                Ok(Issuance::AlreadyPresent)
            }
        }
    }

    /// Ensure a keypair for every directory row, regardless of status.
    ///
    /// Stops at the first failure.
    pub fn provision_all(&self) -> Result<ProvisionReport, RegistryError> {
        let mut report = ProvisionReport::default();
        for entry in self.directory.entries() {
            match self.ensure_for_entry(entry)? {
                Issuance::Generated => report.generated.push(entry.key().clone()),
                Issuance::AlreadyPresent => report.already_present.push(entry.key().clone()),
            }
        }
        info!(
            generated = report.generated.len(),
            already_present = report.already_present.len(),
            "provisioned organization keypairs"
        );
        Ok(report)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Fetch both PEM halves for `org`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyNotFound`] when the organization is not
    /// in the directory or has not been provisioned.
    pub fn get_keys(&self, org: &OrganizationRef) -> Result<StoredKeyPair, RegistryError> {
        let entry = self
            .directory
            .resolve(org)
            .ok_or_else(|| RegistryError::KeyNotFound(org.to_string()))?;
        self.keys_for_entry(entry)
    }

    /// Fetch both PEM halves for a directory row.
    pub fn keys_for_entry(&self, entry: &OrganizationEntry) -> Result<StoredKeyPair, RegistryError> {
        self.store
            .get(entry.key())?
            .ok_or_else(|| RegistryError::KeyNotFound(entry.key().to_string()))
    }

    /// The decoded public key for `org`.
    pub fn public_key(&self, org: &OrganizationRef) -> Result<RsaPublicKey, RegistryError> {
        let pair = self.get_keys(org)?;
        Ok(RsaPublicKey::from_spki_pem(&pair.public_key_pem)?)
    }

    /// The decoded public key for a directory row.
    pub fn public_key_for(&self, entry: &OrganizationEntry) -> Result<RsaPublicKey, RegistryError> {
        let pair = self.keys_for_entry(entry)?;
        Ok(RsaPublicKey::from_spki_pem(&pair.public_key_pem)?)
    }

    /// The decoded keypair for a directory row.
    pub fn signing_key_for(&self, entry: &OrganizationEntry) -> Result<RsaKeyPair, RegistryError> {
        let pair = self.keys_for_entry(entry)?;
        Ok(RsaKeyPair::from_pkcs8_pem(&pair.private_key_pem)?)
    }

    /// The decoded keypair for `org`.
    pub fn signing_key(&self, org: &OrganizationRef) -> Result<RsaKeyPair, RegistryError> {
        let pair = self.get_keys(org)?;
        Ok(RsaKeyPair::from_pkcs8_pem(&pair.private_key_pem)?)
    }
}
