//! In-memory credential store
//!
//! [`MemoryCredentialStore`] satisfies the same contract as the PostgreSQL
//! store and is used by tests and by `STORE_BACKEND=memory` local runs.
//! Uniqueness checks and inserts happen under one write lock, so concurrent
//! duplicate inserts behave like the database's unique constraints.
//!
//! Data is not persisted; everything is lost when the process exits.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::CredentialStore;
use crate::{BlacklistedToken, NewUser, PetstoreError, Result, RoleSet, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    email_index: HashMap<String, Uuid>,
    blacklist: Vec<BlacklistedToken>,
}

/// Thread-safe in-memory credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of blacklist rows
    pub async fn blacklist_len(&self) -> usize {
        self.tables.read().await.blacklist.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.email_index.contains_key(&user.email) {
            return Err(PetstoreError::DuplicateEmail(user.email));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            roles: user.roles,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        tables.email_index.insert(created.email.clone(), created.id);
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_identity(
        &self,
        id: Uuid,
        email: &str,
        roles: &RoleSet,
    ) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .get(&id)
            .filter(|u| u.email == email && &u.roles == roles)
            .cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_active = is_active;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn find_blacklisted_token(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> Result<Option<BlacklistedToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .blacklist
            .iter()
            .filter(|entry| entry.token == token && entry.user_id == user_id)
            .max_by_key(|entry| entry.created_at)
            .cloned())
    }

    async fn is_token_blacklisted(&self, token: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.blacklist.iter().any(|entry| entry.token == token))
    }

    async fn blacklist_token(&self, token: &str, user_id: Uuid) -> Result<BlacklistedToken> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(PetstoreError::NotFound(format!("user {user_id}")));
        }
        if tables
            .blacklist
            .iter()
            .any(|entry| entry.token == token && entry.user_id == user_id)
        {
            return Err(PetstoreError::DuplicateToken);
        }

        let entry = BlacklistedToken::new(token, user_id);
        tables.blacklist.push(entry.clone());
        Ok(entry)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn new_user(email: &str, roles: RoleSet) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            roles,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = MemoryCredentialStore::new();
        let user = assert_ok!(
            store
                .create_user(new_user("client@example.com", RoleSet::single(Role::Client)))
                .await
        );

        assert!(user.is_active);
        let by_email = store.find_user_by_email("client@example.com").await.unwrap();
        assert_eq!(by_email.as_ref().map(|u| u.id), Some(user.id));
        let by_id = store.find_user_by_id(user.id).await.unwrap();
        assert_eq!(by_id, Some(user));
    }

    #[tokio::test]
    async fn test_email_is_case_sensitive_key() {
        let store = MemoryCredentialStore::new();
        store
            .create_user(new_user("Client@example.com", RoleSet::default()))
            .await
            .unwrap();

        assert!(store.find_user_by_email("client@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryCredentialStore::new();
        store
            .create_user(new_user("dup@example.com", RoleSet::default()))
            .await
            .unwrap();

        let err = assert_err!(
            store
                .create_user(new_user("dup@example.com", RoleSet::default()))
                .await
        );
        assert!(matches!(err, PetstoreError::DuplicateEmail(_)));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_only_one_wins() {
        let store = Arc::new(MemoryCredentialStore::new());
        let attempts = (0..8).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .create_user(new_user("race@example.com", RoleSet::default()))
                    .await
            })
        });

        let results = futures::future::join_all(attempts).await;
        let successes = results
            .into_iter()
            .map(|r| r.expect("task panicked"))
            .filter(|r| r.is_ok())
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_identity_lookup_requires_exact_role_set() {
        let store = MemoryCredentialStore::new();
        let both = RoleSet::new([Role::Client, Role::Manager]).unwrap();
        let user = store
            .create_user(new_user("both@example.com", both.clone()))
            .await
            .unwrap();

        let found = store
            .find_user_by_identity(user.id, "both@example.com", &both)
            .await
            .unwrap();
        assert!(found.is_some());

        let subset = store
            .find_user_by_identity(user.id, "both@example.com", &RoleSet::single(Role::Client))
            .await
            .unwrap();
        assert!(subset.is_none());

        let wrong_email = store
            .find_user_by_identity(user.id, "other@example.com", &both)
            .await
            .unwrap();
        assert!(wrong_email.is_none());
    }

    #[tokio::test]
    async fn test_blacklist_is_idempotent_per_pair() {
        let store = MemoryCredentialStore::new();
        let user = store
            .create_user(new_user("logout@example.com", RoleSet::default()))
            .await
            .unwrap();

        assert!(!store.is_token_blacklisted("tok").await.unwrap());
        assert_ok!(store.blacklist_token("tok", user.id).await);
        let err = assert_err!(store.blacklist_token("tok", user.id).await);
        assert!(matches!(err, PetstoreError::DuplicateToken));

        assert!(store.is_token_blacklisted("tok").await.unwrap());
        assert!(store.find_blacklisted_token("tok", user.id).await.unwrap().is_some());
        assert_eq!(store.blacklist_len().await, 1);
    }

    #[tokio::test]
    async fn test_blacklist_for_unknown_user_is_not_found() {
        let store = MemoryCredentialStore::new();

        let err = assert_err!(store.blacklist_token("tok", Uuid::new_v4()).await);
        assert!(matches!(err, PetstoreError::NotFound(_)));
        assert!(!store.is_token_blacklisted("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_user_active() {
        let store = MemoryCredentialStore::new();
        let user = store
            .create_user(new_user("flag@example.com", RoleSet::default()))
            .await
            .unwrap();

        let updated = store.set_user_active(user.id, false).await.unwrap().unwrap();
        assert!(!updated.is_active);
        assert!(updated.updated_at >= user.updated_at);
        assert!(store.set_user_active(Uuid::new_v4(), false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_users_paginates() {
        let store = MemoryCredentialStore::new();
        for i in 0..5 {
            store
                .create_user(new_user(&format!("user{i}@example.com"), RoleSet::default()))
                .await
                .unwrap();
        }

        assert_eq!(store.list_users(2, 0).await.unwrap().len(), 2);
        assert_eq!(store.list_users(10, 3).await.unwrap().len(), 2);
        assert!(store.list_users(10, 10).await.unwrap().is_empty());
    }
}
