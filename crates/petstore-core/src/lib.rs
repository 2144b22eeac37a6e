//! Petstore Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the Petstore backend:
//! - Account models (users, roles, blacklisted tokens)
//! - Common error types
//! - The credential store trait and its PostgreSQL / in-memory implementations
//! - Configuration management

pub mod config;
pub mod memory;
pub mod store;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig, StoreBackend,
};
pub use memory::MemoryCredentialStore;
pub use store::{CredentialStore, PgCredentialStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Petstore operations
#[derive(Error, Debug)]
pub enum PetstoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Token is already blacklisted for this user")]
    DuplicateToken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PetstoreError>;

// ============================================================================
// Roles
// ============================================================================

/// Enumerated account permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Manager,
}

impl Role {
    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Manager => "MANAGER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = PetstoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "CLIENT" => Ok(Role::Client),
            "MANAGER" => Ok(Role::Manager),
            other => Err(PetstoreError::ValidationError(format!("Unknown role: {other}"))),
        }
    }
}

/// Non-empty set of roles held by an account.
///
/// Kept sorted so that equality and the stored form do not depend on the
/// order in which roles were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Build a role set, rejecting an empty collection
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Result<Self> {
        let set: BTreeSet<Role> = roles.into_iter().collect();
        if set.is_empty() {
            return Err(PetstoreError::ValidationError(
                "An account must hold at least one role".to_string(),
            ));
        }
        Ok(Self(set))
    }

    pub fn single(role: Role) -> Self {
        Self(BTreeSet::from([role]))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// True when at least one role is shared with `other`
    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.intersection(&other.0).next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted string form used for storage
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }

    /// Parse the stored string form
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        let roles = values
            .iter()
            .map(|v| v.as_ref().parse::<Role>())
            .collect::<Result<Vec<_>>>()?;
        Self::new(roles)
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::single(Role::Client)
    }
}

impl TryFrom<Vec<Role>> for RoleSet {
    type Error = PetstoreError;

    fn try_from(roles: Vec<Role>) -> Result<Self> {
        Self::new(roles)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.0.into_iter().collect()
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_strings().join(","))
    }
}

// ============================================================================
// Account Models
// ============================================================================

/// Stored user account.
///
/// Carries the password hash, so it is deliberately not `Serialize`; the API
/// layer converts it into a public shape before anything reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub roles: RoleSet,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if the account holds a specific role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}

/// Data required to create a user; id and timestamps are assigned by the store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub roles: RoleSet,
}

/// A bearer token surrendered at logout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistedToken {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl BlacklistedToken {
    pub fn new(token: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            user_id,
            created_at: Utc::now(),
        }
    }
}
