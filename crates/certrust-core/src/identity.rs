//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers certrust passes around.
//! Each identifier is a distinct type: a [`SubjectId`] cannot be passed
//! where an [`OrganizationCode`] is expected.
//!
//! ## Normalization
//!
//! Organization identifiers are case-insensitive. [`OrganizationCode`]
//! stores the trimmed, uppercased form, which is also the key the key
//! registry files keypairs under. [`OrganizationRef`] carries a lookup
//! needle in the same normalized form together with the resolution mode.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Upper bound on organization identifier and subject length.
const MAX_IDENTIFIER_LEN: usize = 256;

fn normalize_org(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyIdentifier {
            kind: "organization identifier",
        });
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::IdentifierTooLong {
            kind: "organization identifier",
            max: MAX_IDENTIFIER_LEN,
        });
    }
    Ok(trimmed.to_uppercase())
}

// ---------------------------------------------------------------------------
// Organization identifiers
// ---------------------------------------------------------------------------

/// The normalized identifier an organization's keypair is stored under.
///
/// Trimmed and uppercased at construction, so `" acme-001 "` and
/// `"ACME-001"` are the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrganizationCode(String);

impl OrganizationCode {
    /// Create a code from a raw identifier, normalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyIdentifier`] for blank input and
    /// [`ValidationError::IdentifierTooLong`] past the length limit.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        normalize_org(value.as_ref()).map(Self)
    }

    /// Access the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganizationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrganizationCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrganizationCode> for String {
    fn from(code: OrganizationCode) -> Self {
        code.0
    }
}

/// A reference to an organization as supplied by a caller.
///
/// Callers may know an organization by its canonical code or by its
/// display name. Resolution against the directory runs in two phases:
/// every code is compared first, and names are consulted only when no
/// code matched. A name can therefore never shadow another organization's
/// code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrganizationRef {
    /// Match by code, falling back to display name.
    Any(String),
    /// Match by canonical code only.
    Code(String),
    /// Match by display name only.
    Name(String),
}

impl OrganizationRef {
    /// A reference that accepts either a code or a display name.
    pub fn any(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        normalize_org(value.as_ref()).map(Self::Any)
    }

    /// A reference that only matches canonical codes.
    pub fn code(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        normalize_org(value.as_ref()).map(Self::Code)
    }

    /// A reference that only matches display names.
    pub fn name(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        normalize_org(value.as_ref()).map(Self::Name)
    }

    /// The normalized needle compared against directory entries.
    pub fn needle(&self) -> &str {
        match self {
            Self::Any(s) | Self::Code(s) | Self::Name(s) => s,
        }
    }

    /// Whether this reference may match on a canonical code.
    pub fn matches_codes(&self) -> bool {
        matches!(self, Self::Any(_) | Self::Code(_))
    }

    /// Whether this reference may match on a display name.
    pub fn matches_names(&self) -> bool {
        matches!(self, Self::Any(_) | Self::Name(_))
    }
}

impl std::fmt::Display for OrganizationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.needle())
    }
}

impl From<&OrganizationCode> for OrganizationRef {
    fn from(code: &OrganizationCode) -> Self {
        Self::Code(code.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Subjects and certificates
// ---------------------------------------------------------------------------

/// The owner of a certificate (a user or account identifier).
///
/// Trimmed at construction; case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject identifier.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentifier { kind: "subject" });
        }
        if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(ValidationError::IdentifierTooLong {
                kind: "subject",
                max: MAX_IDENTIFIER_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the subject string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(subject: SubjectId) -> Self {
        subject.0
    }
}

/// A unique identifier for a stored certificate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(Uuid);

impl CertificateId {
    /// Create a new random certificate identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a certificate identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a certificate identifier from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCertificateId`] for anything that
    /// is not a UUID.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidCertificateId(value.to_string()))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CertificateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CertificateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CertificateId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
