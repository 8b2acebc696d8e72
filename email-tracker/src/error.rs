//! Error types for the email tracker.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response}
};
use serde::Serialize;
use thiserror::Error;

/// Maximum number of tracked email records.
pub const MAX_TRACKED_EMAILS: i64 = 3;

/// Result type alias for the tracker.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur in the email tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Required input was missing or blank.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store already holds the maximum number of records.
    #[error("Email limit reached (Max {max} allowed)")]
    LimitExceeded { max: i64 },

    /// A record with the same address already exists.
    #[error("Email already exists: {address}")]
    DuplicateKey { address: String },

    /// No record with the given id.
    #[error("Tracked email not found: {id}")]
    NotFound { id: String },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Outbound mail transport error.
    #[error("Mail error: {0}")]
    Mail(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Job scheduler error.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Server startup error.
    #[error("Server error: {0}")]
    Server(String),

    /// Internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String)
}

impl From<mail_send::Error> for TrackerError {
    fn from(err: mail_send::Error) -> Self {
        Self::Mail(err.to_string())
    }
}

impl TrackerError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::LimitExceeded { .. } | Self::DuplicateKey { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Returns true for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Error response body for HTTP endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            Self::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            Self::LimitExceeded { .. } => ("LIMIT_EXCEEDED", self.to_string()),
            Self::DuplicateKey { .. } => ("DUPLICATE_KEY", "Email already exists".to_string()),
            Self::NotFound { .. } => ("NOT_FOUND", self.to_string()),
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ("DATABASE_ERROR", "A database error occurred".to_string())
            }
            other => {
                tracing::error!(error = %other, "Internal error");
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string()
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_exceeded_display() {
        let err = TrackerError::LimitExceeded {
            max: MAX_TRACKED_EMAILS
        };
        assert_eq!(err.to_string(), "Email limit reached (Max 3 allowed)");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TrackerError::Validation("address is required".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrackerError::DuplicateKey {
                address: "a@example.com".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrackerError::NotFound {
                id: "missing".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TrackerError::Mail("connection refused".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(TrackerError::LimitExceeded { max: 3 }.is_client_error());
        assert!(!TrackerError::Internal("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_error_response_serialization() {
        let resp = ErrorResponse {
            error: "Email already exists".to_string(),
            code: "DUPLICATE_KEY".to_string()
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Email already exists"));
        assert!(json.contains("DUPLICATE_KEY"));
    }
}
