//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("not authorized to access this route")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// Classify a storage error into an HTTP status and message.
    ///
    /// The query engine and the models surface `sqlx::Error` untranslated;
    /// mapping storage error kinds to HTTP semantics happens only here.
    fn classify_database(e: &sqlx::Error) -> (StatusCode, String) {
        if matches!(e, sqlx::Error::RowNotFound) {
            return (StatusCode::NOT_FOUND, "resource not found".to_string());
        }

        if let Some(db_err) = e.as_database_error() {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    return (
                        StatusCode::BAD_REQUEST,
                        "duplicate field value entered".to_string(),
                    );
                }
                // foreign_key_violation
                Some("23503") => {
                    return (
                        StatusCode::BAD_REQUEST,
                        "referenced resource does not exist".to_string(),
                    );
                }
                // check_violation
                Some("23514") => {
                    return (StatusCode::BAD_REQUEST, "invalid field value".to_string());
                }
                _ => {}
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Database(e) => {
                let (status, message) = Self::classify_database(e);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %e, "database error");
                }
                (status, message)
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Unauthorized | AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
