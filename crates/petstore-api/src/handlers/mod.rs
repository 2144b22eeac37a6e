//! API request handlers

pub mod auth;
pub mod health;
pub mod users;

pub use health::{health_check, metrics, readiness_check};

use crate::error::AppError;

/// Fallback for requests that match no route
pub async fn route_not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}
