//! # Error Types
//!
//! Errors raised by the foundational types. All errors use `thiserror`.
//!
//! Encoding errors are kept separate from validation errors: a caller
//! rendering an audit trail must be able to tell "this payload cannot be
//! canonicalized" apart from "this identifier is malformed".

use thiserror::Error;

/// Top-level error type for `certrust-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonical encoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A domain value failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Error during canonical encoding.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// The value nests deeper than the encoder accepts.
    ///
    /// JSON values cannot be cyclic, so the nesting limit is what guarantees
    /// that encoding terminates.
    #[error("value nests deeper than {limit} levels")]
    DepthLimitExceeded {
        /// The configured nesting limit.
        limit: usize,
    },

    /// The value could not be represented as JSON (e.g. a map with
    /// non-string keys, or a failing `Serialize` impl).
    #[error("value is not serializable as JSON: {0}")]
    NotSerializable(#[from] serde_json::Error),
}

/// Error raised when a domain primitive fails validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier was empty after trimming.
    #[error("{kind} must not be empty")]
    EmptyIdentifier {
        /// Which identifier kind was rejected.
        kind: &'static str,
    },

    /// An identifier exceeded the maximum length.
    #[error("{kind} must not exceed {max} characters")]
    IdentifierTooLong {
        /// Which identifier kind was rejected.
        kind: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// A certificate identifier was not a UUID.
    #[error("invalid certificate id {0:?}")]
    InvalidCertificateId(String),

    /// A timestamp could not be parsed or was not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
