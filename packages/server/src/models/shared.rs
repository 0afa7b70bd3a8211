use common::storage::BlobKey;
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a configuration title (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    check_text("title", title, 256).map_err(AppError::Validation)
}

/// Reject blank text and text longer than `max` characters.
pub fn check_text(field: &str, value: &str, max: usize) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(())
}

/// Like [`check_text`], for a field that may be cleared.
pub fn check_optional_text(
    field: &str,
    value: &Option<Option<String>>,
    max: usize,
) -> Result<(), String> {
    match value {
        Some(Some(v)) => check_text(field, v, max),
        _ => Ok(()),
    }
}

/// Require a field on create.
pub fn require<'a, T>(field: &str, value: &'a Option<T>) -> Result<&'a T, String> {
    value.as_ref().ok_or_else(|| format!("{field} is required"))
}

/// Media reference. Any non-blank text up to 2048 characters: bare file
/// names, relative paths and absolute URLs are all stored as given.
pub fn check_url(field: &str, value: &str) -> Result<(), String> {
    check_text(field, value, 2048)
}

pub fn check_blob_key(value: &Option<Option<String>>) -> Result<(), String> {
    if let Some(Some(raw)) = value {
        BlobKey::parse(raw.as_str()).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Blob keys a nullable blob field refers to.
pub fn blob_refs(value: Option<&str>) -> Vec<BlobKey> {
    value
        .and_then(|raw| BlobKey::parse(raw).ok())
        .into_iter()
        .collect()
}

/// Whether a patch to a nullable text field leaves `current` as it is.
pub fn patch_matches(patch: &Option<Option<String>>, current: &Option<String>) -> bool {
    patch
        .as_ref()
        .is_none_or(|v| v.as_deref().map(str::trim) == current.as_deref())
}

/// Stored form of a nullable text patch.
pub fn trimmed_patch(patch: &Option<Option<String>>) -> Option<Option<String>> {
    patch.as_ref().map(|v| v.as_deref().map(trimmed))
}

/// Trim a string field for storage.
pub fn trimmed(value: &str) -> String {
    value.trim().to_string()
}
