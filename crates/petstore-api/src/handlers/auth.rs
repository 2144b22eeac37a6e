//! Authentication API handlers
//!
//! Register, login, logout and the current-principal lookup. Each handler
//! emits the matching audit event; the business rules live in
//! [`AuthService`](crate::auth::AuthService).

use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::auth::{
    LoginRequest, LoginResponse, LogoutRequest, Principal, PublicUser, RegisterRequest,
};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Register a new user account
///
/// # Responses
///
/// * `201 Created` - the new account as `PublicUser`
/// * `400 Bad Request` - invalid email, names, roles or password policy
/// * `403 Forbidden` - MANAGER requested while manager self-signup is disabled
/// * `409 Conflict` - email already registered
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let email = request.email.clone();

    match state.auth.register(request).await {
        Ok(user) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: user.id,
                email: user.email.clone(),
                roles: user.roles.to_string(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
        }
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                email,
                reason: e.to_string(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(e)
        }
    }
}

/// Login with email and password
///
/// # Responses
///
/// * `200 OK` - the account plus `access_token`
/// * `400 Bad Request` - malformed email or password
/// * `401 Unauthorized` - "Credentials are not valid", whichever one was wrong
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let email = request.email.clone();

    match state.auth.login(request).await {
        Ok((user, access_token)) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: user.id,
                email: user.email.clone(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Ok(Json(LoginResponse {
                user: PublicUser::from(user),
                access_token,
            }))
        }
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: e.to_string(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(e)
        }
    }
}

/// Invalidate the token named in the body
///
/// Requires authentication. Logging out the same token twice succeeds both times.
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth.logout(&request.refresh_token, &principal).await?;

    audit_log(&AuditEvent::Logout {
        user_id: principal.id,
        email: principal.email.clone(),
        ip_address: RequestContext::from_headers(&headers).ip_address,
    });

    Ok(Json(response))
}

/// The authenticated principal
pub async fn me_handler(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(PublicUser::from(principal.0))
}
