//! API error handling

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use petstore_core::PetstoreError;
use serde::{Deserialize, Serialize};

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
    Database(String),
}

impl AppError {
    /// The request carried no usable credential
    pub fn authentication_required() -> Self {
        AppError::Unauthorized("Authentication required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            AppError::Conflict(msg) => write!(f, "conflict: {msg}"),
            AppError::Internal(msg) => write!(f, "internal error: {msg}"),
            AppError::Database(msg) => write!(f, "database error: {msg}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::NotFound(resource) => ApiError::not_found(&resource),
            AppError::BadRequest(msg) => ApiError::bad_request(msg),
            AppError::Unauthorized(msg) => ApiError::unauthorized(msg),
            AppError::Forbidden(msg) => ApiError::forbidden(msg),
            AppError::Conflict(msg) => ApiError::conflict(msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::internal_error()
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Credential store failure");
                ApiError::new("DATABASE_ERROR", "Database operation failed")
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let details: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, details.join(", "))
            })
            .collect();
        messages.sort();

        AppError::BadRequest(format!("Validation failed: {}", messages.join("; ")))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PetstoreError> for AppError {
    fn from(err: PetstoreError) -> Self {
        match err {
            PetstoreError::NotFound(msg) => AppError::NotFound(msg),
            PetstoreError::DuplicateEmail(_) => {
                AppError::Conflict("User with this email already exists".to_string())
            }
            PetstoreError::DuplicateToken => {
                AppError::Conflict("Token has already been invalidated".to_string())
            }
            PetstoreError::ValidationError(msg) => AppError::BadRequest(msg),
            PetstoreError::DatabaseError(msg) => AppError::Database(msg),
            PetstoreError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            PetstoreError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
