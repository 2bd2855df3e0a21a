//! Shared error type and field checks for the content services
//! (authors, testimonials, articles, trainings, ebooks).

use url::Url;

/// Error types for content service operations
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Another entity of the same type already uses the slug
    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Reject blank required text
pub(crate) fn require(value: &str, field: &str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        return Err(ContentError::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}

/// Reject text longer than `max` characters
pub(crate) fn max_chars(value: &str, field: &str, max: usize) -> Result<(), ContentError> {
    if value.chars().count() > max {
        return Err(ContentError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Reject negative display positions
pub(crate) fn non_negative(value: i64, field: &str) -> Result<(), ContentError> {
    if value < 0 {
        return Err(ContentError::ValidationError(format!(
            "{} must be zero or greater",
            field
        )));
    }
    Ok(())
}

/// Reject anything that is not an absolute http(s) URL; blank counts as absent
pub(crate) fn optional_url(value: Option<&str>, field: &str) -> Result<(), ContentError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if !is_http_url(v) => Err(ContentError::ValidationError(format!(
            "{} must be a valid http(s) URL",
            field
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Blank optional text becomes `None`
pub(crate) fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().map_or(false, |v| v.trim().is_empty()) {
        *value = None;
    }
}

/// Whether an error chain ends in a SQLite UNIQUE constraint failure
pub(crate) fn is_unique_violation(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map_or(false, |db| db.is_unique_violation())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_and_max_chars() {
        assert!(require("Titre", "title").is_ok());
        assert!(matches!(require("   ", "title"), Err(ContentError::ValidationError(_))));

        assert!(max_chars("éééé", "title", 4).is_ok());
        assert!(max_chars("ééééé", "title", 4).is_err());

        assert!(non_negative(0, "position").is_ok());
        assert!(non_negative(-1, "position").is_err());
    }

    #[test]
    fn test_optional_url() {
        assert!(optional_url(None, "video_url").is_ok());
        assert!(optional_url(Some(""), "video_url").is_ok());
        assert!(optional_url(Some("https://youtu.be/x"), "video_url").is_ok());
        assert!(optional_url(Some("youtu.be/x"), "video_url").is_err());
        assert!(optional_url(Some("ftp://host/x"), "video_url").is_err());
    }

    #[test]
    fn test_blank_to_none() {
        let mut value = Some("  ".to_string());
        blank_to_none(&mut value);
        assert!(value.is_none());

        let mut value = Some("x".to_string());
        blank_to_none(&mut value);
        assert_eq!(value.as_deref(), Some("x"));
    }

    #[test]
    fn test_unique_violation_detection_ignores_other_errors() {
        let error = anyhow::anyhow!("boom").context("Failed to create article");
        assert!(!is_unique_violation(&error));
    }
}
