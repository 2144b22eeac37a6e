//! JWT token generation and validation
//!
//! Implements bearer-token issuance with HMAC-SHA256 signing.
//! Tokens carry exactly the identity claims `id`, `email` and `roles`
//! plus the registered `iat` / `exp` timestamps.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use petstore_core::{AuthConfig, ConfigError, Role, RoleSet, User};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT Claims structure containing user identity
///
/// These claims are embedded in the access token and extracted during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub id: Uuid,
    /// User's email address
    pub email: String,
    /// User's roles at issuance
    pub roles: Vec<Role>,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

impl Claims {
    /// Role claim as a set; an empty claim is not a valid identity
    pub fn role_set(&self) -> Result<RoleSet, JwtError> {
        RoleSet::new(self.roles.iter().copied()).map_err(|_| JwtError::InvalidToken)
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token lifetime overflows the expiry timestamp")]
    ExpiryOverflow,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    secret: String,
    /// Token expiration time in seconds (default: 7200 = 2 hours)
    pub expiration_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

impl JwtConfig {
    /// Create a configuration; an empty secret is refused
    pub fn new(secret: impl Into<String>, expiration_secs: u64) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        Ok(Self {
            secret,
            expiration_secs,
        })
    }

    /// Build from the application's auth settings
    pub fn from_auth_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let secret = config
            .jwt_secret
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired("JWT_SECRET".to_string()))?;
        Self::new(secret, config.token_expiration_secs)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Generate a signed access token for an authenticated user
///
/// # Example
///
/// ```ignore
/// use petstore_api::auth::jwt::{generate_access_token, JwtConfig};
///
/// let config = JwtConfig::new("change-me", 7200)?;
/// let token = generate_access_token(&config, &user)?;
/// ```
pub fn generate_access_token(config: &JwtConfig, user: &User) -> Result<String, JwtError> {
    generate_access_token_at(config, user, unix_now()?)
}

/// Generate an access token as if issued at `issued_at` (Unix seconds)
pub fn generate_access_token_at(
    config: &JwtConfig,
    user: &User,
    issued_at: u64,
) -> Result<String, JwtError> {
    let claims = Claims {
        id: user.id,
        email: user.email.clone(),
        roles: user.roles.iter().collect(),
        iat: issued_at,
        exp: issued_at
            .checked_add(config.expiration_secs)
            .ok_or(JwtError::ExpiryOverflow)?,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate an access token and extract claims
///
/// Signature and expiry are both checked; there is no leeway on `exp`.
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config() -> JwtConfig {
        JwtConfig::new("unit-test-secret", 7200).unwrap()
    }

    fn test_user(roles: RoleSet) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            roles,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let config = test_config();
        let user = test_user(RoleSet::new([Role::Client, Role::Manager]).unwrap());

        let token = generate_access_token(&config, &user).expect("Failed to generate token");
        let claims = validate_access_token(&config, &token).expect("Failed to validate token");

        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role_set().unwrap(), user.roles);
        assert_eq!(claims.exp - claims.iat, 7200);
    }

    #[test]
    fn test_token_carries_only_identity_claims() {
        let config = test_config();
        let token = generate_access_token(&config, &test_user(RoleSet::default())).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let raw = decode::<serde_json::Value>(&token, &DecodingKey::from_secret(&[]), &validation)
            .unwrap()
            .claims;

        let mut keys: Vec<&str> = raw.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["email", "exp", "iat", "id", "roles"]);
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();
        let result = validate_access_token(&config, "invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new("secret1", 7200).unwrap();
        let config2 = JwtConfig::new("secret2", 7200).unwrap();

        let token = generate_access_token(&config1, &test_user(RoleSet::default())).unwrap();

        let result = validate_access_token(&config2, &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let config = test_config();
        let now = unix_now().unwrap();

        // Issued 3 hours ago with a 2 hour lifetime
        let token =
            generate_access_token_at(&config, &test_user(RoleSet::default()), now - 3 * 3600)
                .unwrap();

        let result = validate_access_token(&config, &token);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_lifetime_overflow_is_an_error() {
        let config = JwtConfig::new("unit-test-secret", u64::MAX).unwrap();
        let result = generate_access_token(&config, &test_user(RoleSet::default()));
        assert!(matches!(result, Err(JwtError::ExpiryOverflow)));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtConfig::new("", 7200).is_err());
        assert!(JwtConfig::from_auth_config(&AuthConfig::default()).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("unit-test-secret"));
    }

    #[test]
    fn test_empty_role_claim_is_invalid() {
        let claims = Claims {
            id: Uuid::new_v4(),
            email: "x@example.com".to_string(),
            roles: vec![],
            iat: 0,
            exp: 1,
        };
        assert!(matches!(claims.role_set(), Err(JwtError::InvalidToken)));
    }
}
