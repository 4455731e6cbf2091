//! Field-level checks for request bodies.
//!
//! Mutation routes validate raw JSON against the exact expected shape so a
//! wrong type produces a message naming the field instead of a generic
//! deserialization error.

use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// The field must be present and a JSON boolean.
pub fn require_bool(body: &Value, field: &str) -> Result<bool, ApiError> {
    body.get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::bad_request(format!("{field} must be a boolean")))
}

/// The field must be an array whose items are all UUID strings.
pub fn require_uuid_array(body: &Value, field: &str) -> Result<Vec<Uuid>, ApiError> {
    let invalid = || ApiError::bad_request(format!("{field} must be an array of ids"));

    body.get(field)
        .and_then(Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .ok_or_else(invalid)
        })
        .collect()
}

/// Trims `value` and rejects it when empty or longer than `max_chars`.
pub fn required_text(value: &str, field: &str, max_chars: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ApiError::bad_request(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like `required_text`, but blank input becomes `None`.
pub fn optional_text(
    value: Option<String>,
    field: &str,
    max_chars: usize,
) -> Result<Option<String>, ApiError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => required_text(&raw, field, max_chars).map(Some),
        _ => Ok(None),
    }
}

/// Clamps an optional `limit` query parameter into `1..=max`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}
