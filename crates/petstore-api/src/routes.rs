//! API route definitions
//!
//! [`api_routes`] and [`access_policy`] describe the same set of routes:
//! one says which handler serves a path, the other who may call it.

use crate::auth::AccessPolicy;
use crate::handlers::{auth, health, users};
use crate::state::AppState;
use axum::{
    http::Method,
    routing::{get, patch, post},
    Router,
};
use petstore_core::Role;
use std::sync::Arc;

pub const REGISTER: &str = "/v1/auth/register";
pub const LOGIN: &str = "/v1/auth/login";
pub const LOGOUT: &str = "/v1/auth/logout";
pub const ME: &str = "/v1/auth/me";
pub const USERS: &str = "/v1/users";
pub const USER_STATUS: &str = "/v1/users/:id/status";

/// Who may call each route
pub fn access_policy() -> AccessPolicy {
    AccessPolicy::new()
        // Operational
        .public(Method::GET, "/health")
        .public(Method::GET, "/ready")
        .public(Method::GET, "/metrics")
        // Authentication
        .public(Method::POST, REGISTER)
        .public(Method::POST, LOGIN)
        .authenticated(Method::POST, LOGOUT)
        .authenticated(Method::GET, ME)
        // Account administration
        .require_any(Method::GET, USERS, &[Role::Manager])
        .require_any(Method::PATCH, USER_STATUS, &[Role::Manager])
}

/// All routes, before the gate and global middleware are applied
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route(REGISTER, post(auth::register_handler))
        .route(LOGIN, post(auth::login_handler))
        .route(LOGOUT, post(auth::logout_handler))
        .route(ME, get(auth::me_handler))
        .route(USERS, get(users::list_users))
        .route(USER_STATUS, patch(users::update_user_status))
}
