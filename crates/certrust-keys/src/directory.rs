//! # Organization Directory
//!
//! The static list of organizations allowed to hold keys, with the status
//! field that gates whether they may issue signatures.
//!
//! ## File format
//!
//! A JSON or YAML list of rows. Field names follow either the lowercase
//! form (`code`, `name`, `status`, `address`, `website`) or the registry
//! export form (`CIN`, `Name`, `Status`, `Address`, `Website`, `url`).
//! When a row spells a field more than once, the first spelling in
//! `CIN`, `cin`, `code` order (and likewise for the other fields) with a
//! non-null value wins. Scalar values are accepted as strings, numbers or
//! booleans and are trimmed. Rows with neither a code nor a name are
//! skipped.
//!
//! ## Registry keys
//!
//! A row with a code is keyed by the normalized code. A row without one is
//! keyed by `NAME:` plus its normalized name, so a name can never collide
//! with another row's code. A row whose key repeats an earlier row's is
//! skipped with a warning.
//!
//! ## Resolution
//!
//! Lookups are case-insensitive and run in two phases: all codes first,
//! then names. A display name can never capture a lookup that matches
//! another organization's code.

use std::collections::HashMap;
use std::path::Path;

use certrust_core::{OrganizationCode, OrganizationRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DirectoryError;

// ---------------------------------------------------------------------------
// EligibilityStatus
// ---------------------------------------------------------------------------

/// An organization's directory status.
///
/// `ACTIVE`, `VERIFIED` and `APPROVED` (compared case-insensitively) are
/// eligible. Any other value is kept verbatim for audit output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EligibilityStatus {
    /// Operating normally.
    Active,
    /// Verified by the directory operator.
    Verified,
    /// Approved for issuance.
    Approved,
    /// Any other status (e.g. `SUSPENDED`, `STRUCK OFF`, empty).
    Other(String),
}

impl EligibilityStatus {
    /// Whether organizations in this status may issue signatures.
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for EligibilityStatus {
    fn from(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase();
        match normalized.as_str() {
            "ACTIVE" => Self::Active,
            "VERIFIED" => Self::Verified,
            "APPROVED" => Self::Approved,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for EligibilityStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<EligibilityStatus> for String {
    fn from(status: EligibilityStatus) -> Self {
        status.to_string()
    }
}

impl std::fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Verified => f.write_str("VERIFIED"),
            Self::Approved => f.write_str("APPROVED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// OrganizationEntry
// ---------------------------------------------------------------------------

/// Accepted spellings per field, in priority order. The first spelling
/// present with a non-null value wins.
const CODE_FIELDS: &[&str] = &["CIN", "cin", "code"];
const NAME_FIELDS: &[&str] = &["Name", "name"];
const STATUS_FIELDS: &[&str] = &["Status", "status"];
const ADDRESS_FIELDS: &[&str] = &["Address", "address"];
const WEBSITE_FIELDS: &[&str] = &["Website", "website", "url"];

/// Prefix that keeps name-derived registry keys apart from codes.
pub const NAME_KEY_PREFIX: &str = "NAME:";

/// One directory row as it appears on disk, fields already picked.
#[derive(Debug, Default)]
struct RawEntry {
    code: String,
    name: String,
    status: String,
    address: String,
    website: String,
}

impl RawEntry {
    fn from_row(row: &Value) -> Result<Self, DirectoryError> {
        let row = row.as_object().ok_or(DirectoryError::NotAnObject)?;
        let pick = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|k| row.get(*k).filter(|v| !v.is_null()))
                .map(scalar_text)
                .unwrap_or_default()
        };
        Ok(Self {
            code: pick(CODE_FIELDS),
            name: pick(NAME_FIELDS),
            status: pick(STATUS_FIELDS),
            address: pick(ADDRESS_FIELDS),
            website: pick(WEBSITE_FIELDS),
        })
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// A directory row after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationEntry {
    /// Canonical code (e.g. a corporate identification number), trimmed.
    /// Empty when the row has none.
    pub code: String,
    /// Display name, trimmed.
    pub name: String,
    /// Eligibility status.
    pub status: EligibilityStatus,
    /// Postal address.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// Website URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub website: String,
    #[serde(skip)]
    key: OrganizationCode,
}

impl OrganizationEntry {
    /// Build an entry from its code, name and status.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::MissingIdentifier`] when both code and name
    /// are blank, or [`DirectoryError::InvalidIdentifier`] when the
    /// identifier fails validation.
    pub fn new(code: &str, name: &str, status: &str) -> Result<Self, DirectoryError> {
        Self::build(
            code.trim().to_string(),
            name.trim().to_string(),
            EligibilityStatus::from(status),
            String::new(),
            String::new(),
        )
    }

    /// Attach an address.
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.trim().to_string();
        self
    }

    /// Attach a website.
    pub fn with_website(mut self, website: &str) -> Self {
        self.website = website.trim().to_string();
        self
    }

    fn build(
        code: String,
        name: String,
        status: EligibilityStatus,
        address: String,
        website: String,
    ) -> Result<Self, DirectoryError> {
        let key = if !code.is_empty() {
            OrganizationCode::new(&code)?
        } else if !name.is_empty() {
            OrganizationCode::new(format!("{NAME_KEY_PREFIX}{name}"))?
        } else {
            return Err(DirectoryError::MissingIdentifier);
        };
        Ok(Self {
            code,
            name,
            status,
            address,
            website,
            key,
        })
    }

    fn from_raw(raw: RawEntry) -> Result<Self, DirectoryError> {
        Self::build(
            raw.code,
            raw.name,
            EligibilityStatus::from(raw.status),
            raw.address,
            raw.website,
        )
    }

    /// The identifier this organization's keypair is stored under: the
    /// normalized code, or [`NAME_KEY_PREFIX`] plus the normalized name
    /// when the row has no code.
    pub fn key(&self) -> &OrganizationCode {
        &self.key
    }

    /// Whether this organization may issue signatures.
    pub fn is_eligible(&self) -> bool {
        self.status.is_eligible()
    }

    fn code_matches(&self, needle: &str) -> bool {
        !self.code.is_empty() && self.code.to_uppercase() == needle
    }

    fn name_matches(&self, needle: &str) -> bool {
        !self.name.is_empty() && self.name.to_uppercase() == needle
    }
}

// ---------------------------------------------------------------------------
// OrganizationDirectory
// ---------------------------------------------------------------------------

/// The loaded organization directory.
#[derive(Debug, Clone, Default)]
pub struct OrganizationDirectory {
    entries: Vec<OrganizationEntry>,
}

impl OrganizationDirectory {
    /// Build a directory from already-normalized entries. An entry whose
    /// registry key repeats an earlier one is dropped with a warning.
    pub fn new(entries: Vec<OrganizationEntry>) -> Self {
        Self::from_parsed(entries.into_iter().map(Ok))
    }

    /// Parse a JSON list of rows.
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        let rows: Vec<Value> = serde_json::from_str(json)?;
        Ok(Self::from_rows(&rows))
    }

    /// Parse a YAML list of rows.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DirectoryError> {
        let rows: Vec<Value> = serde_yaml::from_str(yaml)?;
        Ok(Self::from_rows(&rows))
    }

    /// Load a directory file. `.yaml` and `.yml` files are read as YAML,
    /// everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let text = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let directory = if is_yaml {
            Self::from_yaml_str(&text)?
        } else {
            Self::from_json_str(&text)?
        };
        debug!(path = %path.display(), organizations = directory.len(), "loaded organization directory");
        Ok(directory)
    }

    fn from_rows(rows: &[Value]) -> Self {
        Self::from_parsed(
            rows.iter()
                .map(|row| RawEntry::from_row(row).and_then(OrganizationEntry::from_raw)),
        )
    }

    /// Keep the valid rows, each registry key owned by its first row.
    fn from_parsed(
        rows: impl Iterator<Item = Result<OrganizationEntry, DirectoryError>>,
    ) -> Self {
        let mut entries: Vec<OrganizationEntry> = Vec::new();
        let mut owners: HashMap<OrganizationCode, usize> = HashMap::new();
        for (index, parsed) in rows.enumerate() {
            let result = parsed.and_then(|entry| match owners.get(entry.key()) {
                Some(&first_row) => Err(DirectoryError::DuplicateKey {
                    key: entry.key().to_string(),
                    first_row,
                }),
                None => Ok(entry),
            });
            match result {
                Ok(entry) => {
                    owners.insert(entry.key().clone(), index);
                    entries.push(entry);
                }
                Err(e) => warn!(row = index, error = %e, "skipping directory row"),
            }
        }
        Self { entries }
    }

    /// All rows, in file order.
    pub fn entries(&self) -> &[OrganizationEntry] {
        &self.entries
    }

    /// The rows whose status is eligible, in file order.
    pub fn eligible(&self) -> impl Iterator<Item = &OrganizationEntry> {
        self.entries.iter().filter(|e| e.is_eligible())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the row an organization reference points at.
    pub fn resolve(&self, org: &OrganizationRef) -> Option<&OrganizationEntry> {
        let needle = org.needle();
        if org.matches_codes() {
            if let Some(entry) = self.entries.iter().find(|e| e.code_matches(needle)) {
                return Some(entry);
            }
        }
        if org.matches_names() {
            return self.entries.iter().find(|e| e.name_matches(needle));
        }
        None
    }

    /// Find the row whose registry key is `key`.
    pub fn find_by_key(&self, key: &OrganizationCode) -> Option<&OrganizationEntry> {
        self.entries.iter().find(|e| e.key() == key)
    }

    /// Resolve an organization and require an eligible status.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::UnknownOrganization`] when no row matches.
    /// - [`DirectoryError::Ineligible`] when the row's status is not
    ///   eligible.
    pub fn check_eligibility(
        &self,
        org: &OrganizationRef,
    ) -> Result<&OrganizationEntry, DirectoryError> {
        let entry = self
            .resolve(org)
            .ok_or_else(|| DirectoryError::UnknownOrganization(org.to_string()))?;
        if !entry.is_eligible() {
            return Err(DirectoryError::Ineligible {
                organization: entry.key().to_string(),
                status: entry.status.to_string(),
            });
        }
        Ok(entry)
    }
}
