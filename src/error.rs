//! Error types for the TrustTunnel manager
//!
//! Router-delegated authentication distinguishes four failure classes:
//! the router answered outside the challenge-response protocol, the router
//! could not be reached, the router rejected the credentials, or something
//! failed inside the manager itself. Operators need to tell these apart, end
//! users only ever see a sanitized message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for manager operations
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Error types for manager operations
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Router reachable, but it answered in a way the auth protocol does not define
    #[error("Router protocol error: {0}")]
    Protocol(String),

    /// Network failure or timeout reaching the router
    #[error("Router unreachable: {0}")]
    Unreachable(String),

    /// Router explicitly rejected the credentials
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Failure inside the manager (random source, task join, ...)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client errors that are neither connect nor timeout failures
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    NetworkUnreachable,

    // Authentication errors (1100-1199)
    InvalidCredentials,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,

    // Service errors (1600-1699)
    ExternalServiceError,

    // Protocol errors (1700-1799)
    ProtocolViolation,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::NetworkUnreachable => 1004,
            ErrorCode::InvalidCredentials => 1101,
            ErrorCode::ConfigurationInvalid => 1202,
            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::ExternalServiceError => 1603,
            ErrorCode::ProtocolViolation => 1701,
            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1100..=1199 => "authentication",
            1200..=1299 => "configuration",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1700..=1799 => "protocol",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

impl ManagerError {
    /// Create a protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an unreachable error
    pub fn unreachable<S: Into<String>>(msg: S) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Map ManagerError to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            ManagerError::Protocol(_) => ErrorCode::ProtocolViolation,
            ManagerError::Unreachable(msg) if msg.contains("timed out") => {
                ErrorCode::ConnectionTimeout
            }
            ManagerError::Unreachable(_) => ErrorCode::NetworkUnreachable,
            ManagerError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ManagerError::Internal(_) | ManagerError::Io(_) | ManagerError::Generic(_) => {
                ErrorCode::InternalError
            }
            ManagerError::Config(_) => ErrorCode::ConfigurationInvalid,
            ManagerError::InvalidInput(_) => ErrorCode::InvalidInput,
            ManagerError::Http(_) => ErrorCode::ExternalServiceError,
            ManagerError::Json(_) => ErrorCode::ParsingFailed,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ManagerError::Unreachable(_))
    }

    /// Check if error indicates an authentication issue
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ManagerError::InvalidCredentials)
    }

    /// Message safe to show to the end user.
    ///
    /// Never includes router status codes, bodies or challenge values.
    pub fn sanitized_message(&self) -> String {
        match self {
            ManagerError::Protocol(_) => "Router authentication protocol error".to_string(),
            ManagerError::Unreachable(_) => "Router unreachable".to_string(),
            ManagerError::InvalidCredentials => "Invalid username or password".to_string(),
            ManagerError::Config(_) => "Configuration error".to_string(),
            ManagerError::InvalidInput(_) => "Invalid request".to_string(),
            ManagerError::Http(_) => "HTTP request failed".to_string(),
            ManagerError::Json(_) => "Data parsing error".to_string(),
            ManagerError::Internal(_) | ManagerError::Io(_) | ManagerError::Generic(_) => {
                "Internal error occurred".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ManagerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ManagerError::Unreachable(format!("request timed out: {err}"))
        } else if err.is_connect() {
            ManagerError::Unreachable(format!("connection failed: {err}"))
        } else {
            ManagerError::Http(err)
        }
    }
}

impl From<config::ConfigError> for ManagerError {
    fn from(err: config::ConfigError) -> Self {
        ManagerError::Config(err.to_string())
    }
}

/// Error logging and reporting utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error with the level its class deserves.
    ///
    /// Infrastructure and protocol failures are operator problems and log at
    /// `warn`/`error`; rejected credentials are routine and log at `info`.
    pub fn log_error(error: &ManagerError, operation: &str) {
        let code = error.to_error_code();
        match error {
            ManagerError::InvalidCredentials | ManagerError::InvalidInput(_) => tracing::info!(
                error_code = code.as_number(),
                category = code.category(),
                operation,
                "{}",
                error
            ),
            ManagerError::Unreachable(_) => tracing::warn!(
                error_code = code.as_number(),
                category = code.category(),
                operation,
                "{}",
                error
            ),
            _ => tracing::error!(
                error_code = code.as_number(),
                category = code.category(),
                operation,
                "{}",
                error
            ),
        }
    }

    /// Format error for API responses
    pub fn format_api_error(error: &ManagerError) -> serde_json::Value {
        let code = error.to_error_code();
        serde_json::json!({
            "ok": false,
            "error": error.sanitized_message(),
            "code": code.as_number(),
            "category": code.category(),
            "retryable": error.is_retryable(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_map_to_distinct_codes() {
        let unreachable = ManagerError::unreachable("connection refused");
        let protocol = ManagerError::protocol("missing X-NDM-Challenge");
        let invalid = ManagerError::InvalidCredentials;

        assert_eq!(unreachable.to_error_code(), ErrorCode::NetworkUnreachable);
        assert_eq!(protocol.to_error_code(), ErrorCode::ProtocolViolation);
        assert_eq!(invalid.to_error_code(), ErrorCode::InvalidCredentials);
        assert_eq!(unreachable.to_error_code().category(), "connection");
        assert_eq!(protocol.to_error_code().category(), "protocol");
        assert_eq!(invalid.to_error_code().category(), "authentication");
    }

    #[test]
    fn test_timeout_is_reported_as_timeout() {
        let err = ManagerError::unreachable("request timed out: deadline");
        assert_eq!(err.to_error_code(), ErrorCode::ConnectionTimeout);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_sanitized_message_hides_router_details() {
        let protocol = ManagerError::protocol("unexpected status 418 from http://10.0.0.1/auth");
        assert!(!protocol.sanitized_message().contains("418"));
        assert!(!protocol.sanitized_message().contains("10.0.0.1"));

        let unreachable = ManagerError::unreachable("dial tcp 192.168.1.1:80");
        assert_eq!(unreachable.sanitized_message(), "Router unreachable");
    }

    #[test]
    fn test_format_api_error() {
        let body = ErrorReporter::format_api_error(&ManagerError::InvalidCredentials);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Invalid username or password");
        assert_eq!(body["code"], 1101);
        assert_eq!(body["retryable"], false);
    }

    #[test]
    fn test_auth_error_classification() {
        assert!(ManagerError::InvalidCredentials.is_auth_error());
        assert!(!ManagerError::unreachable("x").is_auth_error());
        assert!(!ManagerError::protocol("x").is_retryable());
    }
}
