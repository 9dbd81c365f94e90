//! Error types for the perovskite web service.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant carries enough context to produce an actionable HTTP error body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unknown environment '{value}', cannot obtain database connection string")]
    UnknownEnvironment { value: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database is not available: {reason}")]
    DatabaseUnavailable { reason: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42703" for undefined column
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{message}")]
    NoRecords { message: String },

    #[error("File not found: {file_name}")]
    FileNotFound { file_name: String },

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create an unknown environment error.
    pub fn unknown_environment(value: impl Into<String>) -> Self {
        Self::UnknownEnvironment {
            value: value.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn database_unavailable(reason: impl Into<String>) -> Self {
        Self::DatabaseUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn no_records(message: impl Into<String>) -> Self {
        Self::NoRecords {
            message: message.into(),
        }
    }

    pub fn file_not_found(file_name: impl Into<String>) -> Self {
        Self::FileNotFound {
            file_name: file_name.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::UnknownEnvironment { .. } => {
                Some("Set ENVIRONMENT to one of: staging, production, dev")
            }
            Self::DatabaseUnavailable { .. } => {
                Some("Check the database settings and restart the service")
            }
            Self::Timeout { .. } => {
                Some("Consider increasing the timeout or narrowing the query")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::DatabaseUnavailable { .. }
        )
    }

    /// Short machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownEnvironment { .. } | Self::Configuration { .. } => "configuration",
            Self::Connection { .. } => "connection",
            Self::DatabaseUnavailable { .. } => "database_unavailable",
            Self::Database { .. } => "database",
            Self::Timeout { .. } => "timeout",
            Self::InvalidInput { .. } => "invalid_input",
            Self::NoRecords { .. } => "no_records",
            Self::FileNotFound { .. } => "file_not_found",
            Self::Template { .. } => "template",
            Self::Internal { .. } => "internal",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            // SQLSTATE class 42: syntax error or access rule violation (unknown column/table)
            Self::Database {
                sql_state: Some(code),
                ..
            } if code.starts_with("42") => StatusCode::BAD_REQUEST,
            Self::NoRecords { .. } | Self::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Connection { .. } | Self::DatabaseUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert sqlx errors to AppError.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => AppError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                AppError::database(
                    db_err.message(),
                    code,
                    "Check the requested columns and dataset",
                )
            }
            sqlx::Error::RowNotFound => AppError::no_records("No rows returned"),
            // The acquire timeout is not known here; the executor reports it when it is
            sqlx::Error::PoolTimedOut => {
                AppError::database_unavailable("timed out waiting for a pooled connection")
            }
            sqlx::Error::PoolClosed => {
                AppError::connection("Connection pool is closed", "Restart the service")
            }
            sqlx::Error::Io(io_err) => AppError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => AppError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => AppError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                AppError::invalid_input(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                AppError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => AppError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => AppError::internal("Database worker crashed"),
            _ => AppError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::template(err.to_string())
    }
}

/// Result type alias for service operations.
pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
                suggestion: self.suggestion(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_unknown_environment_message() {
        let err = AppError::unknown_environment("qa");
        assert!(err.to_string().contains("Unknown environment 'qa'"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_error_suggestion() {
        let err = AppError::database("Syntax error", Some("42601".to_string()), "Check SQL");
        assert_eq!(err.suggestion(), Some("Check SQL"));
        assert_eq!(AppError::invalid_input("x").suggestion(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(AppError::timeout("query", 30).is_retryable());
        assert!(AppError::connection("err", "sugg").is_retryable());
        assert!(!AppError::invalid_input("bad").is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::invalid_input("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::file_not_found("a.pdf").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::database_unavailable("down").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::timeout("query", 5).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_undefined_column_maps_to_bad_request() {
        let err = AppError::database("column does not exist", Some("42703".to_string()), "x");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = AppError::database("deadlock", Some("40P01".to_string()), "x");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pool_timeout_does_not_invent_a_duration() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::DatabaseUnavailable { .. }));
        assert!(err.is_retryable());
        assert!(!err.to_string().contains("30s"));
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = AppError::file_not_found("missing.pdf").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["code"], "file_not_found");
        assert_eq!(json["error"]["message"], "File not found: missing.pdf");
        assert!(json["error"].get("suggestion").is_none());
    }
}
