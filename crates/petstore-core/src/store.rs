//! Credential store
//!
//! The authentication core reads and writes accounts and blacklisted tokens
//! only through [`CredentialStore`]. [`PgCredentialStore`] is the production
//! implementation backed by SQLx and PostgreSQL; the expected table layout is
//! in `schema.sql` next to this crate's manifest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{BlacklistedToken, NewUser, PetstoreError, Result, RoleSet, User};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Trait for credential storage operations
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user. Fails with `DuplicateEmail` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Get user by login email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by ID
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Get the user whose id, email and role set all match exactly
    async fn find_user_by_identity(
        &self,
        id: Uuid,
        email: &str,
        roles: &RoleSet,
    ) -> Result<Option<User>>;

    /// List users, oldest first
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>>;

    /// Set the active flag. Returns `None` if the user does not exist.
    async fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>>;

    /// Most recent blacklist entry for this token and user
    async fn find_blacklisted_token(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> Result<Option<BlacklistedToken>>;

    /// Whether the token has been blacklisted by any user
    async fn is_token_blacklisted(&self, token: &str) -> Result<bool>;

    /// Record a token as invalid. Fails with `DuplicateToken` if the pair exists.
    async fn blacklist_token(&self, token: &str, user_id: Uuid) -> Result<BlacklistedToken>;

    /// Cheap round trip used by readiness checks
    async fn ping(&self) -> Result<()>;
}

/// PostgreSQL credential store
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| PetstoreError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        tracing::info!(max_connections, "Connected to PostgreSQL credential store");

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    roles: Vec<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = PetstoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let roles = RoleSet::from_strings(&row.roles).map_err(|e| {
            PetstoreError::DatabaseError(format!("Corrupt role set for user {}: {e}", row.id))
        })?;

        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            roles,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Blacklist row from database
#[derive(Debug, FromRow)]
struct BlacklistRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<BlacklistRow> for BlacklistedToken {
    fn from(row: BlacklistRow) -> Self {
        BlacklistedToken {
            id: row.id,
            token: row.token,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, roles, is_active, created_at, updated_at";

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code.into_owned())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some(UNIQUE_VIOLATION)
}

/// Blacklist insert failure, mapped the same way the in-memory store reports it
fn blacklist_error(user_id: Uuid, err: sqlx::Error) -> PetstoreError {
    match sqlstate(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => PetstoreError::DuplicateToken,
        Some(FOREIGN_KEY_VIOLATION) => PetstoreError::NotFound(format!("user {user_id}")),
        _ => db_error("Failed to blacklist token", err),
    }
}

fn db_error(context: &str, err: sqlx::Error) -> PetstoreError {
    PetstoreError::DatabaseError(format!("{context}: {err}"))
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, password_hash, roles, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.roles.to_strings())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PetstoreError::DuplicateEmail(user.email.clone())
            } else {
                db_error("Failed to create user", e)
            }
        })?;

        User::try_from(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to fetch user by email", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to fetch user by id", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_identity(
        &self,
        id: Uuid,
        email: &str,
        roles: &RoleSet,
    ) -> Result<Option<User>> {
        // Roles are stored sorted, so array equality is set equality.
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND email = $2 AND roles = $3"
        ))
        .bind(id)
        .bind(email)
        .bind(roles.to_strings())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch user by identity", e))?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update user status", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_blacklisted_token(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> Result<Option<BlacklistedToken>> {
        let row: Option<BlacklistRow> = sqlx::query_as(
            r#"
            SELECT id, token, user_id, created_at
            FROM token_blacklist
            WHERE token = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(token)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch blacklisted token", e))?;

        Ok(row.map(BlacklistedToken::from))
    }

    async fn is_token_blacklisted(&self, token: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to check blacklist", e))?;

        Ok(exists)
    }

    async fn blacklist_token(&self, token: &str, user_id: Uuid) -> Result<BlacklistedToken> {
        let row: BlacklistRow = sqlx::query_as(
            r#"
            INSERT INTO token_blacklist (id, token, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, token, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| blacklist_error(user_id, e))?;

        Ok(row.into())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Ping failed", e))?;
        Ok(())
    }
}
