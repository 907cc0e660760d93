//! Error handling module for the OKR backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Failure reported by a repository or session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write
    Conflict(String),
    /// The storage backend failed
    Storage(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::Conflict(msg) => write!(f, "conflict: {}", msg),
            RepositoryError::Storage(msg) => write!(f, "storage: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Storage(err.to_string()),
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or out-of-range input; nothing was read or written
    Validation(String),
    /// Missing or invalid credentials
    Unauthorized(String),
    /// The actor lacks the role or ownership the action needs
    Forbidden(String),
    /// The action would break a lifecycle rule or team invariant
    Conflict(String),
    /// A required entity does not exist
    NotFound(String),
    /// A repository call failed; `message` is safe to show, `cause` is not
    Repository {
        message: String,
        cause: RepositoryError,
    },
    /// Internal server error
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(format!("{} not found", entity))
    }

    /// Whether this is an authorization or invariant denial.
    pub fn is_denial(&self) -> bool {
        matches!(self, AppError::Forbidden(_) | AppError::Conflict(_))
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Repository { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Repository { .. } => codes::INTERNAL_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the client-facing error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Repository { message, .. } => message.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Repository { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Attach a stable, user-facing message to a repository failure.
pub trait RepoContext<T> {
    fn context(self, message: &str) -> Result<T, AppError>;
}

impl<T> RepoContext<T> for Result<T, RepositoryError> {
    fn context(self, message: &str) -> Result<T, AppError> {
        self.map_err(|cause| {
            tracing::error!("{}: {}", message, cause);
            AppError::Repository {
                message: message.to_string(),
                cause,
            }
        })
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_denial() {
            tracing::debug!("Request denied: {}", self);
        }
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_hides_cause() {
        let err: Result<(), _> = Err(RepositoryError::Storage("disk I/O error".to_string()));
        let app_err = err.context("Failed to create OKR").unwrap_err();

        assert_eq!(app_err.message(), "Failed to create OKR");
        assert_eq!(app_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let source = std::error::Error::source(&app_err).unwrap();
        assert!(source.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_denials_are_distinct_from_validation() {
        assert!(AppError::Forbidden("no".into()).is_denial());
        assert!(AppError::Conflict("no".into()).is_denial());
        assert!(!AppError::Validation("bad".into()).is_denial());
        assert!(!AppError::not_found("Team").is_denial());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::not_found("OKR").message(), "OKR not found");
        assert_eq!(AppError::not_found("OKR").error_code(), codes::NOT_FOUND);
    }
}
