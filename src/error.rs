//! Error types for query composition, result interpretation and assembly.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the gateway pipeline.
///
/// Variants fall into three classes: client errors (400), missing data (404)
/// and upstream failures (500). See [`ApiError::status_code`].
#[derive(Debug, Error)]
pub enum ApiError {
    // Client errors (400)
    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("invalid value \"{value}\" for parameter {name}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<FieldError> },

    // Missing data (404)
    #[error("{message}")]
    NotFound { message: String },

    // Upstream failures (500)
    #[cfg(feature = "remote")]
    #[error("failed to query {endpoint}: {source}")]
    NetworkError {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid triplestore response: {source}")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },

    #[error("upstream failure: {message}")]
    Upstream { message: String },

    // Startup
    #[error("cannot load settings from {path}: {message}")]
    Config { path: PathBuf, message: String },
}

/// Single validation failure with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Returns the HTTP status equivalent for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::BadRequest { .. }
            | Self::Invalid { .. } => 400,
            Self::NotFound { .. } => 404,
            _ => 500,
        }
    }

    /// Returns the CLI exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Invalid { .. } => 1,
            Self::NotFound { .. } => 4,
            _ if self.status_code() == 400 => 2,
            _ => 3, // IO / upstream
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::missing("instance_uri").status_code(), 400);
        assert_eq!(ApiError::bad_request("bad op").status_code(), 400);
        assert_eq!(ApiError::not_found("no such class").status_code(), 404);
        assert_eq!(ApiError::upstream("insert failed").status_code(), 500);
        let err = ApiError::Config {
            path: PathBuf::from("settings.json"),
            message: "file not found".into(),
        };
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn exit_codes() {
        let err = ApiError::Invalid {
            errors: vec![FieldError {
                path: "/rdfs:label".into(),
                message: "expected string".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(ApiError::missing("class_uri").exit_code(), 2);
        assert_eq!(ApiError::upstream("boom").exit_code(), 3);
        assert_eq!(ApiError::not_found("gone").exit_code(), 4);
    }

    #[test]
    fn missing_parameter_names_the_parameter() {
        let err = ApiError::missing("instance_uri");
        assert_eq!(err.to_string(), "missing required parameter: instance_uri");
    }

    #[test]
    fn field_error_display() {
        let err = FieldError {
            path: "/person:age".into(),
            message: "\"x\" is not of type \"integer\"".into(),
        };
        assert_eq!(err.to_string(), "/person:age: \"x\" is not of type \"integer\"");
    }
}
