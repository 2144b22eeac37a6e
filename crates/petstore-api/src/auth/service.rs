//! Authentication service layer
//!
//! Business logic for registration, login, logout and identity resolution.
//! The service talks to storage only through [`CredentialStore`], so the same
//! code runs against PostgreSQL in production and the in-memory store in tests.

use super::jwt::{generate_access_token, validate_access_token, Claims, JwtConfig, JwtError};
use super::models::{LoginRequest, LogoutResponse, RegisterRequest};
use super::password::{hash_password_with_config, verify_password, PasswordConfig};
use crate::error::AppError;
use petstore_core::{AuthConfig, ConfigError, CredentialStore, NewUser, PetstoreError, Role, User};
use std::sync::Arc;
use uuid::Uuid;

/// Message for every failed login, whichever credential was wrong
pub const INVALID_CREDENTIALS: &str = "Credentials are not valid";

/// Claims verified but matched no stored identity
pub const TOKEN_NOT_VALID: &str = "Token is not valid";

/// Claims matched a deactivated account
pub const USER_NOT_ACTIVE: &str = "User is not active";

/// Outcome of matching token claims against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Active(User),
    Inactive(User),
    Unknown,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
    allow_manager_signup: bool,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn CredentialStore>, jwt_config: JwtConfig) -> Self {
        Self {
            store,
            jwt_config,
            password_config: PasswordConfig::default(),
            allow_manager_signup: true,
        }
    }

    /// Build from the application's auth settings
    pub fn from_config(
        store: Arc<dyn CredentialStore>,
        config: &AuthConfig,
    ) -> Result<Self, ConfigError> {
        let jwt_config = JwtConfig::from_auth_config(config)?;
        Ok(Self::new(store, jwt_config).with_manager_signup(config.allow_manager_signup))
    }

    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.password_config = config;
        self
    }

    pub fn with_manager_signup(mut self, allowed: bool) -> Self {
        self.allow_manager_signup = allowed;
        self
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    /// Register a new user
    ///
    /// The account is created active with the requested roles, `{CLIENT}` when
    /// none are given. Fails with Conflict if the email is already registered.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let roles = request.role_set();

        if roles.contains(Role::Manager) {
            if !self.allow_manager_signup {
                return Err(AppError::Forbidden(
                    "Registration cannot grant the MANAGER role".to_string(),
                ));
            }
            tracing::warn!(email = %request.email, "Self-registration requested the MANAGER role");
        }

        if self.store.find_user_by_email(&request.email).await?.is_some() {
            return Err(PetstoreError::DuplicateEmail(request.email).into());
        }

        let password_hash = self.hash(request.password).await?;

        // The store's unique constraint still decides concurrent registrations
        let user = self
            .store
            .create_user(NewUser {
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                password_hash,
                roles,
            })
            .await?;

        tracing::info!(user_id = %user.id, roles = %user.roles, "User registered");
        Ok(user)
    }

    /// Login with email and password
    ///
    /// Returns the account and a freshly signed access token. The active flag
    /// is not checked here; deactivated accounts are refused when the token
    /// is next presented.
    pub async fn login(&self, request: LoginRequest) -> Result<(User, String), AppError> {
        let Some(user) = self.store.find_user_by_email(&request.email).await? else {
            tracing::debug!("Login failed: unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self.verify(request.password, user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "Login failed: password mismatch");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = generate_access_token(&self.jwt_config, &user)
            .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;

        Ok((user, token))
    }

    /// Invalidate `token` on behalf of the authenticated `user`
    ///
    /// Idempotent: a token that is already blacklisted for this user succeeds
    /// without writing a second row.
    pub async fn logout(&self, token: &str, user: &User) -> Result<LogoutResponse, AppError> {
        if self.store.find_user_by_id(user.id).await?.is_none() {
            return Err(AppError::Unauthorized("User not found".to_string()));
        }

        if self
            .store
            .find_blacklisted_token(token, user.id)
            .await?
            .is_none()
        {
            match self.store.blacklist_token(token, user.id).await {
                Ok(_) | Err(PetstoreError::DuplicateToken) => {}
                Err(PetstoreError::NotFound(_)) => {
                    return Err(AppError::Unauthorized("User not found".to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(LogoutResponse::logged_out())
    }

    /// Verify a bearer token's signature and expiry
    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        validate_access_token(&self.jwt_config, token)
    }

    /// Match verified claims against the stored account
    ///
    /// Id, email and role set must all match exactly, so a role change makes
    /// earlier tokens unresolvable.
    pub async fn identify(&self, claims: &Claims) -> Result<Resolution, AppError> {
        let Ok(roles) = claims.role_set() else {
            return Ok(Resolution::Unknown);
        };

        Ok(
            match self
                .store
                .find_user_by_identity(claims.id, &claims.email, &roles)
                .await?
            {
                Some(user) if user.is_active => Resolution::Active(user),
                Some(user) => Resolution::Inactive(user),
                None => Resolution::Unknown,
            },
        )
    }

    /// Resolve the principal for verified claims
    pub async fn resolve_principal(&self, claims: &Claims) -> Result<User, AppError> {
        match self.identify(claims).await? {
            Resolution::Active(user) => Ok(user),
            Resolution::Inactive(_) => Err(AppError::Unauthorized(USER_NOT_ACTIVE.to_string())),
            Resolution::Unknown => Err(AppError::Unauthorized(TOKEN_NOT_VALID.to_string())),
        }
    }

    /// Whether `token` was surrendered at logout by anyone
    pub async fn is_token_blacklisted(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.store.is_token_blacklisted(token).await?)
    }

    pub async fn current_user(&self, id: Uuid) -> Result<User, AppError> {
        self.store
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        Ok(self.store.list_users(limit, offset).await?)
    }

    /// Activate or deactivate an account
    pub async fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<User, AppError> {
        self.store
            .set_user_active(id, is_active)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    async fn hash(&self, password: String) -> Result<String, AppError> {
        let config = self.password_config.clone();
        tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}
