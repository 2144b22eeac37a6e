//! Account administration handlers (MANAGER only)

use crate::audit::{audit_log, AuditEvent};
use crate::auth::{ListUsersQuery, Principal, PublicUser, UpdateStatusRequest};
use crate::error::AppError;
use crate::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Page of accounts
#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
    pub limit: i64,
    pub offset: i64,
}

/// List accounts, oldest first
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = query.bounds();
    let users = state.auth.list_users(limit, offset).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(PublicUser::from).collect(),
        limit,
        offset,
    }))
}

/// Activate or deactivate an account
///
/// Deactivation takes effect on the account's next request: its tokens
/// stop resolving even though they still verify.
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.set_user_active(id, request.is_active).await?;

    audit_log(&AuditEvent::AccountStatusChanged {
        user_id: user.id,
        email: user.email.clone(),
        is_active: user.is_active,
        changed_by: Some(principal.id),
    });

    Ok(Json(PublicUser::from(user)))
}
