//! Authorization gate for protected routes
//!
//! Two layers:
//! - [`blacklist_middleware`] runs on every request and rejects any bearer
//!   token that was surrendered at logout, before routing or verification.
//! - [`auth_gate`] runs per route. It consults the [`AccessPolicy`], verifies
//!   the token, resolves the principal against the store and applies the
//!   role gate. On success the [`Principal`] is added to request extensions.
//!
//! [`AccessPolicy`]: super::policy::AccessPolicy

use super::policy::RouteAccess;
use super::service::{Resolution, TOKEN_NOT_VALID, USER_NOT_ACTIVE};
use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use petstore_core::User;
use std::sync::Arc;

/// Message for a token that was invalidated at logout
pub const INVALID_TOKEN: &str = "Invalid token";

/// Message for a principal lacking every required role
pub const MISSING_ROLE: &str = "User does not have the required role";

/// The authenticated account for the current request
///
/// Extract in handlers with `Extension<Principal>`.
#[derive(Debug, Clone)]
pub struct Principal(pub User);

impl std::ops::Deref for Principal {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

/// Bearer token from the Authorization header, if well formed
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests presenting a blacklisted token
///
/// Requests without a bearer token pass through untouched.
pub async fn blacklist_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(request.headers()) {
        if state.auth.is_token_blacklisted(token).await? {
            let ctx = RequestContext::from_headers(request.headers());
            audit_log(&AuditEvent::BlacklistedToken {
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            return Err(AppError::Unauthorized(INVALID_TOKEN.to_string()));
        }
    }

    Ok(next.run(request).await)
}

/// Per-route authentication and role check
///
/// # Usage
///
/// ```ignore
/// let app = Router::new()
///     .route("/v1/users", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate));
/// ```
pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().clone();

    let access = state.policy.lookup(&method, &path);
    if *access == RouteAccess::Public {
        return Ok(next.run(request).await);
    }

    let ctx = RequestContext::from_headers(request.headers());
    let token = bearer_token(request.headers()).ok_or_else(AppError::authentication_required)?;

    let claims = match state.auth.verify_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
                reason: e.to_string(),
            });
            return Err(AppError::Unauthorized(TOKEN_NOT_VALID.to_string()));
        }
    };

    let user = match state.auth.identify(&claims).await? {
        Resolution::Active(user) => user,
        Resolution::Inactive(user) => {
            audit_log(&AuditEvent::InactiveUser {
                user_id: user.id,
                email: user.email,
                ip_address: ctx.ip_address,
            });
            return Err(AppError::Unauthorized(USER_NOT_ACTIVE.to_string()));
        }
        Resolution::Unknown => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
                reason: "Claims do not match a stored account".to_string(),
            });
            return Err(AppError::Unauthorized(TOKEN_NOT_VALID.to_string()));
        }
    };

    if !access.permits(&user.roles) {
        let required_roles = match access {
            RouteAccess::Roles(required) => required.to_string(),
            _ => String::new(),
        };
        audit_log(&AuditEvent::AccessDenied {
            user_id: user.id,
            email: user.email.clone(),
            resource: format!("{method} {path}"),
            required_roles,
            ip_address: ctx.ip_address,
            user_agent: ctx.user_agent,
        });
        return Err(AppError::Forbidden(MISSING_ROLE.to_string()));
    }

    tracing::debug!(user_id = %user.id, route = %path, "Request authorized");
    request.extensions_mut().insert(Principal(user));

    Ok(next.run(request).await)
}
