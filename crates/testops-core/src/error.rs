//! Error types for TestOps Copilot.
//!
//! Two layers of errors exist:
//!
//! - [`ApiError`]: the normalized wire-level failure shape `{ code, message, details? }`
//!   produced by the gateway for every outgoing call.
//! - [`TestOpsError`]: the application-wide error, wrapping `ApiError` and adding
//!   configuration, validation and storage failures that never reach the network.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Error code taxonomy shared by the backend and the client.
///
/// Unknown codes sent by a server are preserved in [`ErrorCode::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    Validation,
    Auth,
    Permission,
    NotFound,
    RateLimit,
    GenerationFailed,
    ModelUnavailable,
    InvalidSpec,
    Integration,
    /// Specialization of [`ErrorCode::Integration`] for the GitLab target.
    GitLab,
    FileTooLarge,
    InvalidFileType,
    UploadFailed,
    /// Synthesized locally when no response reached the client.
    Network,
    /// A service was used before its connection details were configured.
    NotConfigured,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::Permission => "PERMISSION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimit => "RATE_LIMIT",
            Self::GenerationFailed => "GENERATION_FAILED",
            Self::ModelUnavailable => "MODEL_UNAVAILABLE",
            Self::InvalidSpec => "INVALID_SPEC",
            Self::Integration => "INTEGRATION_ERROR",
            Self::GitLab => "GITLAB_ERROR",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::UploadFailed => "UPLOAD_FAILED",
            Self::Network => "NETWORK_ERROR",
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Returns true for integration failures, including the GitLab specialization.
    pub fn is_integration(&self) -> bool {
        matches!(self, Self::Integration | Self::GitLab)
    }

    /// Default code for an HTTP status when the body carries no error shape.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 => Self::Auth,
            403 => Self::Permission,
            404 => Self::NotFound,
            413 => Self::FileTooLarge,
            415 => Self::InvalidFileType,
            429 => Self::RateLimit,
            503 => Self::ModelUnavailable,
            other => Self::Other(format!("HTTP_{other}")),
        }
    }

    /// Default user-facing message for a code.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Validation => "Data validation failed",
            Self::Auth => "Authentication failed",
            Self::Permission => "Insufficient permissions",
            Self::NotFound => "Resource not found",
            Self::RateLimit => "Request limit exceeded",
            Self::GenerationFailed => "Test generation failed",
            Self::ModelUnavailable => "The AI model is temporarily unavailable",
            Self::InvalidSpec => "Invalid specification",
            Self::Integration => "Integration failed",
            Self::GitLab => "Could not reach GitLab",
            Self::FileTooLarge => "File is too large",
            Self::InvalidFileType => "Unsupported file type",
            Self::UploadFailed => "File upload failed",
            Self::Network => "Network error occurred. Please check your connection.",
            Self::NotConfigured => "Service is not configured",
            Self::Other(_) => "Something went wrong. Please try again later.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "VALIDATION_ERROR" => Self::Validation,
            "AUTH_ERROR" => Self::Auth,
            "PERMISSION_ERROR" => Self::Permission,
            "NOT_FOUND" => Self::NotFound,
            "RATE_LIMIT" => Self::RateLimit,
            "GENERATION_FAILED" => Self::GenerationFailed,
            "MODEL_UNAVAILABLE" => Self::ModelUnavailable,
            "INVALID_SPEC" => Self::InvalidSpec,
            "INTEGRATION_ERROR" => Self::Integration,
            "GITLAB_ERROR" => Self::GitLab,
            "FILE_TOO_LARGE" => Self::FileTooLarge,
            "INVALID_FILE_TYPE" => Self::InvalidFileType,
            "UPLOAD_FAILED" => Self::UploadFailed,
            "NETWORK_ERROR" => Self::Network,
            "NOT_CONFIGURED" => Self::NotConfigured,
            _ => Self::Other(code),
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// Normalized failure of an outgoing call.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
    /// HTTP status that produced this error, if a response was received.
    #[serde(skip)]
    pub status: Option<u16>,
    /// Server-provided backoff hint (429 responses).
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            status: None,
            retry_after: None,
        }
    }

    /// An error carrying the default message for its code.
    pub fn from_code(code: ErrorCode) -> Self {
        let message = code.default_message();
        Self::new(code, message)
    }

    /// The error synthesized when the transport fails before any response.
    pub fn network(cause: impl fmt::Display) -> Self {
        let mut error = Self::from_code(ErrorCode::Network);
        let mut details = serde_json::Map::new();
        details.insert(
            "cause".to_string(),
            serde_json::Value::String(cause.to_string()),
        );
        error.details = Some(details);
        error
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotConfigured, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn is_network(&self) -> bool {
        self.code == ErrorCode::Network
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401) || self.code == ErrorCode::Auth
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404) || self.code == ErrorCode::NotFound
    }

    pub fn is_not_configured(&self) -> bool {
        self.code == ErrorCode::NotConfigured
    }
}

/// A shared error type for the entire application.
#[derive(Error, Debug, Clone)]
pub enum TestOpsError {
    /// Failure reported by (or synthesized for) an outgoing call.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Service used without connection details (GitLab, model provider).
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Client-side validation failure, raised before any call is made.
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence layer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TestOpsError {
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_configured(&self) -> bool {
        match self {
            Self::NotConfigured(_) => true,
            Self::Api(api) => api.is_not_configured(),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Api(api) => api.code == ErrorCode::Validation,
            _ => false,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Api(api) if api.is_network())
    }

    /// The wire error code, if this error maps onto the shared taxonomy.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api(api) => Some(api.code.clone()),
            Self::Validation { .. } => Some(ErrorCode::Validation),
            Self::NotConfigured(_) => Some(ErrorCode::NotConfigured),
            _ => None,
        }
    }

    /// Message suitable for a banner notification.
    pub fn display_message(&self) -> String {
        match self {
            Self::Api(api) => api.message.clone(),
            Self::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for TestOpsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TestOpsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TestOpsError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TestOpsError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TestOpsError>`.
pub type Result<T> = std::result::Result<T, TestOpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(ErrorCode::Network.as_str(), "NETWORK_ERROR");
        assert_eq!(ErrorCode::GitLab.to_string(), "GITLAB_ERROR");
        assert_eq!(
            "RATE_LIMIT".parse::<ErrorCode>().unwrap(),
            ErrorCode::RateLimit
        );
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let code: ErrorCode = "QUOTA_EXCEEDED".parse().unwrap();
        assert_eq!(code, ErrorCode::Other("QUOTA_EXCEEDED".to_string()));
        assert_eq!(code.as_str(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn test_api_error_deserializes_server_body() {
        let body = r#"{"code":"MODEL_UNAVAILABLE","message":"try later","details":{"retry":true}}"#;
        let error: ApiError = serde_json::from_str(body).unwrap();
        assert_eq!(error.code, ErrorCode::ModelUnavailable);
        assert_eq!(error.message, "try later");
        assert!(error.details.unwrap().contains_key("retry"));
        assert!(error.status.is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Auth);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::Permission);
        assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimit);
        assert_eq!(
            ErrorCode::from_status(500),
            ErrorCode::Other("HTTP_500".to_string())
        );
    }

    #[test]
    fn test_network_error_shape() {
        let error = ApiError::network("connection refused");
        assert!(error.is_network());
        assert_eq!(
            error.details.unwrap()["cause"],
            serde_json::json!("connection refused")
        );
    }

    #[test]
    fn test_integration_specialization() {
        assert!(ErrorCode::GitLab.is_integration());
        assert!(ErrorCode::Integration.is_integration());
        assert!(!ErrorCode::Network.is_integration());
    }

    #[test]
    fn test_display_message() {
        let err = TestOpsError::from(ApiError::validation("email is required"));
        assert_eq!(err.display_message(), "email is required");
        assert!(err.is_validation());

        let err = TestOpsError::not_configured("GitLab not configured");
        assert!(err.is_not_configured());
        assert_eq!(err.code(), Some(ErrorCode::NotConfigured));
    }
}
