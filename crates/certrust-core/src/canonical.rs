//! # Canonical Encoding — Deterministic Byte Production
//!
//! This module defines `CanonicalBytes`, the only form in which structured
//! payloads are signed or verified.
//!
//! ## Encoding Rules
//!
//! - Scalars (string, number, boolean, null) encode exactly as a strict JSON
//!   serializer encodes them. String escaping and number formatting follow
//!   RFC 8785 (JCS) via `serde_jcs`, which matches ECMAScript
//!   `JSON.stringify` for every scalar.
//! - Arrays encode as `[` + comma-joined elements in original order + `]`.
//! - Objects encode as `{` + comma-joined `"key":value` pairs + `}`, with
//!   keys sorted by their UTF-8 bytes, ascending.
//! - No whitespace is ever emitted.
//!
//! The encoding never depends on key insertion order, on whether
//! `serde_json` was built with `preserve_order`, or on the host locale.
//!
//! ## Termination
//!
//! `serde_json::Value` trees cannot contain cycles, so the one way encoding
//! could fail to terminate is unbounded nesting. The encoder rejects values
//! nested deeper than [`MAX_NESTING_DEPTH`] with
//! [`EncodingError::DepthLimitExceeded`]. This is the same limit `serde_json`
//! enforces when decoding, so every value obtained by parsing JSON text
//! encodes successfully.

use serde::Serialize;
use serde_json::Value;

use crate::error::EncodingError;

/// Maximum container nesting accepted by the encoder.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Bytes produced exclusively by the canonical encoder.
///
/// # Invariants
///
/// - Constructed only by [`canonicalize()`] or [`CanonicalBytes::new()`].
/// - Always valid UTF-8 and always valid JSON.
/// - Object keys are sorted bytewise at every level; no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// The value is first converted to a `serde_json::Value`; types whose
    /// `Serialize` impl cannot produce JSON are rejected with
    /// [`EncodingError::NotSerializable`].
    pub fn new(obj: &impl Serialize) -> Result<Self, EncodingError> {
        let value = serde_json::to_value(obj)?;
        canonicalize(&value)
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Access the canonical encoding as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    ///
    /// Never true for encoder output; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Display for CanonicalBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a JSON value.
///
/// Pure function: the output depends only on the structure of `value`.
///
/// # Errors
///
/// [`EncodingError::DepthLimitExceeded`] if containers nest deeper than
/// [`MAX_NESTING_DEPTH`].
pub fn canonicalize(value: &Value) -> Result<CanonicalBytes, EncodingError> {
    let mut out = String::new();
    write_value(value, 0, &mut out)?;
    Ok(CanonicalBytes(out))
}

/// Append the canonical form of `value` to `out`.
///
/// `depth` is the number of containers enclosing `value`.
fn write_value(value: &Value, depth: usize, out: &mut String) -> Result<(), EncodingError> {
    match value {
        Value::Array(items) => {
            let level = enter(depth)?;
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, level, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let level = enter(depth)?;
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_jcs::to_string(key)?);
                out.push(':');
                write_value(item, level, out)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_jcs::to_string(scalar)?),
    }
    Ok(())
}

fn enter(depth: usize) -> Result<usize, EncodingError> {
    let level = depth + 1;
    if level > MAX_NESTING_DEPTH {
        return Err(EncodingError::DepthLimitExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    Ok(level)
}
