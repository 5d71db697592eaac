//! # Request Extraction
//!
//! JSON body extraction with rejections mapped to [`AppError::BadRequest`],
//! plus a [`Validate`] hook for rules serde cannot express.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule validation for request DTOs.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to a 400.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

/// Require a non-blank string field.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_rejected() {
        assert!(require_non_blank("email", "  ").is_err());
        assert!(require_non_blank("email", "a@example.com").is_ok());
    }
}
