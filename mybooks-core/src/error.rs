use std::borrow::Cow;

use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Permission(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Storage(anyhow::Error::new(err))
    }
}

impl ApiError {
    /// Build a single-field validation failure for checks that cannot be
    /// expressed as derive attributes.
    pub fn invalid(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Owned(message.into()));

        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        ApiError::Validation(errors)
    }

    /// Map a non-success HTTP status and its body onto the error taxonomy.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_error_message(body)
            .unwrap_or_else(|| format!("request failed with status {}", status));

        match status {
            401 => ApiError::Auth(message),
            403 => ApiError::Permission(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            400 | 422 => ApiError::BadRequest(message),
            _ => ApiError::Server { status, message },
        }
    }

    /// Short, stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Auth(_) => "auth",
            ApiError::Permission(_) => "permission",
            ApiError::Validation(_) => "validation",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Server { .. } => "server",
            ApiError::Decode(_) => "decode",
            ApiError::Storage(_) => "storage",
            ApiError::Config(_) => "config",
        }
    }
}

/// Pull the most useful message out of a backend error body.
///
/// The backend answers with a plain string, `{"message": ..}`,
/// `{"error": ..}` or `{"details": ..}` depending on the endpoint.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(serde_json::Value::Object(map)) => {
            for key in ["message", "error"] {
                if let Some(serde_json::Value::String(s)) = map.get(key) {
                    return Some(s.clone());
                }
            }
            map.get("details").map(|details| details.to_string())
        }
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_taxonomy() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Auth(_)));
        assert!(matches!(ApiError::from_status(403, ""), ApiError::Permission(_)));
        assert!(matches!(ApiError::from_status(404, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(409, ""), ApiError::Conflict(_)));
        assert!(matches!(ApiError::from_status(400, ""), ApiError::BadRequest(_)));
        assert!(matches!(ApiError::from_status(422, ""), ApiError::BadRequest(_)));
        assert!(matches!(
            ApiError::from_status(503, ""),
            ApiError::Server { status: 503, .. }
        ));
    }

    #[test]
    fn message_is_extracted_from_known_body_shapes() {
        assert_eq!(
            extract_error_message(r#"{"message":"Livre introuvable"}"#).as_deref(),
            Some("Livre introuvable")
        );
        assert_eq!(
            extract_error_message(r#"{"error":"Bad credentials"}"#).as_deref(),
            Some("Bad credentials")
        );
        assert_eq!(
            extract_error_message(r#"{"details":{"email":"taken"}}"#).as_deref(),
            Some(r#"{"email":"taken"}"#)
        );
        assert_eq!(extract_error_message("plain text").as_deref(), Some("plain text"));
        assert_eq!(extract_error_message("   "), None);
    }

    #[test]
    fn invalid_builds_field_error() {
        let err = ApiError::invalid("quantity", "out_of_stock", "Book is out of stock");
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("quantity"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
