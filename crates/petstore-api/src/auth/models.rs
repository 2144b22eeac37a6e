//! Request and response shapes for the authentication endpoints
//!
//! Stored accounts ([`petstore_core::User`]) never reach the wire directly.
//! Handlers convert them to [`PublicUser`], which has no secret field.

use chrono::{DateTime, Utc};
use petstore_core::{Role, RoleSet, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::password::validate_password_policy;

fn password_policy(password: &str) -> Result<(), ValidationError> {
    validate_password_policy(password).map_err(|message| {
        let mut err = ValidationError::new("password_policy");
        err.message = Some(message.into());
        err
    })
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(email(message = "email must be an email"))]
    pub email: String,

    #[validate(custom(function = "password_policy"))]
    pub password: String,

    #[validate(length(min = 1, message = "firstName should not be empty"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "lastName should not be empty"))]
    pub last_name: String,

    /// Requested roles; absent means `{CLIENT}`
    #[validate(length(min = 1, message = "roles should not be empty"))]
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
}

impl RegisterRequest {
    /// Role set to create the account with
    pub fn role_set(&self) -> RoleSet {
        self.roles
            .as_ref()
            .and_then(|roles| RoleSet::new(roles.iter().copied()).ok())
            .unwrap_or_default()
    }
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(email(message = "email must be an email"))]
    pub email: String,

    #[validate(custom(function = "password_policy"))]
    pub password: String,
}

/// Logout request; the token named here is the one invalidated
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "refreshToken should not be empty"))]
    pub refresh_token: String,
}

/// Account as exposed over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: RoleSet,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            roles: user.roles,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login result: the account plus its freshly issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub access_token: String,
}

/// Logout acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

impl LogoutResponse {
    pub fn logged_out() -> Self {
        Self {
            success: true,
            message: "User logged out".to_string(),
        }
    }
}

/// Body of `PATCH /v1/users/:id/status`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

/// Pagination for `GET /v1/users`
#[derive(Debug, Clone, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Largest page `GET /v1/users` returns
pub const MAX_PAGE_SIZE: i64 = 100;

fn default_limit() -> i64 {
    20
}

impl ListUsersQuery {
    /// Limit and offset clamped to the accepted range
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE_SIZE), self.offset.max(0))
    }
}

impl Default for ListUsersQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register_body(extra: serde_json::Value) -> RegisterRequest {
        let mut body = json!({
            "email": "client@example.com",
            "password": "ClientPassword123",
            "firstName": "Client",
            "lastName": "User",
        });
        if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_register_defaults_to_client() {
        let req = register_body(json!({}));
        assert!(req.validate().is_ok());
        assert_eq!(req.role_set(), RoleSet::single(Role::Client));
    }

    #[test]
    fn test_register_with_roles() {
        let req = register_body(json!({ "roles": ["MANAGER", "CLIENT"] }));
        assert!(req.validate().is_ok());
        assert!(req.role_set().contains(Role::Manager));
        assert_eq!(req.role_set().len(), 2);
    }

    #[test]
    fn test_register_validation_failures() {
        assert!(register_body(json!({ "email": "not-an-email" })).validate().is_err());
        assert!(register_body(json!({ "password": "weakpass" })).validate().is_err());
        assert!(register_body(json!({ "firstName": "" })).validate().is_err());
        assert!(register_body(json!({ "roles": [] })).validate().is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let register = json!({
            "email": "client@example.com",
            "password": "ClientPassword123",
            "firstName": "Client",
            "lastName": "User",
            "isActive": false,
        });
        assert!(serde_json::from_value::<RegisterRequest>(register).is_err());

        let login = json!({ "email": "client@example.com", "password": "ClientPassword123", "remember": true });
        assert!(serde_json::from_value::<LoginRequest>(login).is_err());

        let logout = json!({ "refreshToken": "tok", "userId": "someone-else" });
        assert!(serde_json::from_value::<LogoutRequest>(logout).is_err());
    }

    #[test]
    fn test_password_policy_message_surfaces() {
        let err = register_body(json!({ "password": "alllowercase1" }))
            .validate()
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("The password must have an Uppercase, lowercase letter, and a number"));
    }

    #[test]
    fn test_public_user_has_no_secret() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "client@example.com".to_string(),
            first_name: "Client".to_string(),
            last_name: "User".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            roles: RoleSet::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let body = serde_json::to_value(LoginResponse {
            user: PublicUser::from(user),
            access_token: "tok".to_string(),
        })
        .unwrap();

        assert_eq!(body["firstName"], "Client");
        assert_eq!(body["isActive"], true);
        assert_eq!(body["access_token"], "tok");
        assert!(!body.to_string().contains("argon2id"));
    }

    #[test]
    fn test_list_query_bounds() {
        let q = ListUsersQuery {
            limit: 1000,
            offset: -5,
        };
        assert_eq!(q.bounds(), (MAX_PAGE_SIZE, 0));
        assert_eq!(ListUsersQuery::default().bounds(), (20, 0));
    }
}
