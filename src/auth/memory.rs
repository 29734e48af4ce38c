//! In-memory collaborators.
//!
//! DashMap-backed user directory and refresh token store, for tests and for
//! running the gateway without PostgreSQL. Token operations touch a single
//! map entry and are atomic. An email change in the directory moves the row
//! between two keys and is not.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::directory::{UserDirectory, UserRecord};
use super::error::StoreError;
use super::refresh::{RefreshToken, RefreshTokenStore};
use crate::core_types::Principal;

/// Thread-safe in-memory user directory.
pub struct MemoryUserDirectory {
    /// Email -> user
    by_email: DashMap<String, UserRecord>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            by_email: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

impl Default for MemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        self.by_email
            .get(email)
            .map(|u| u.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn update_credentials(
        &self,
        principal: Principal,
        email: &str,
        credential_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, StoreError> {
        let current = self
            .by_email
            .iter()
            .find(|u| u.principal == principal)
            .map(|u| u.value().clone())
            .ok_or(StoreError::NotFound)?;

        let updated = UserRecord {
            email: email.to_string(),
            credential_hash: credential_hash.to_string(),
            updated_at: at,
            ..current.clone()
        };

        if current.email == email {
            self.by_email.insert(updated.email.clone(), updated.clone());
            return Ok(updated);
        }

        match self.by_email.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(updated.clone());
            }
        }
        self.by_email.remove(&current.email);
        Ok(updated)
    }

    async fn upgrade_membership(
        &self,
        principal: Principal,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, StoreError> {
        let mut user = self
            .by_email
            .iter_mut()
            .find(|u| u.principal == principal)
            .ok_or(StoreError::NotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = at;
        Ok(user.value().clone())
    }
}

/// Thread-safe in-memory refresh token store.
pub struct MemoryRefreshStore {
    /// Token string -> row
    tokens: DashMap<String, RefreshToken>,
}

impl MemoryRefreshStore {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for MemoryRefreshStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshStore {
    async fn create(&self, token: RefreshToken) -> Result<RefreshToken, StoreError> {
        self.tokens.insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError> {
        self.tokens
            .get(token)
            .map(|t| t.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut row = self.tokens.get_mut(token).ok_or(StoreError::NotFound)?;
        row.revoked_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(email: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            principal: Principal::new_v4(),
            email: email.to_string(),
            credential_hash: "hash".to_string(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_directory_create_and_find() {
        let dir = MemoryUserDirectory::new();
        let u = dir.create(user("a@example.com")).await.unwrap();
        assert_eq!(dir.find_by_email("a@example.com").await.unwrap(), u);
        assert!(matches!(
            dir.find_by_email("b@example.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_directory_upgrade_membership() {
        let dir = MemoryUserDirectory::new();
        let u = dir.create(user("a@example.com")).await.unwrap();
        let at = Utc::now();

        let upgraded = dir.upgrade_membership(u.principal, at).await.unwrap();
        assert!(upgraded.is_chirpy_red);
        assert_eq!(upgraded.updated_at, at);
        assert!(dir.find_by_email("a@example.com").await.unwrap().is_chirpy_red);

        assert!(matches!(
            dir.upgrade_membership(Principal::new_v4(), at).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_directory_duplicate_email() {
        let dir = MemoryUserDirectory::new();
        dir.create(user("a@example.com")).await.unwrap();
        assert!(matches!(
            dir.create(user("a@example.com")).await,
            Err(StoreError::Conflict)
        ));
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_update_moves_email() {
        let dir = MemoryUserDirectory::new();
        let u = dir.create(user("old@example.com")).await.unwrap();
        let at = Utc::now();

        let updated = dir
            .update_credentials(u.principal, "new@example.com", "hash2", at)
            .await
            .unwrap();
        assert_eq!(updated.principal, u.principal);
        assert_eq!(updated.credential_hash, "hash2");
        assert_eq!(updated.updated_at, at);
        assert_eq!(updated.created_at, u.created_at);

        assert!(dir.find_by_email("old@example.com").await.is_err());
        assert_eq!(dir.find_by_email("new@example.com").await.unwrap(), updated);
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_update_same_email_replaces_hash() {
        let dir = MemoryUserDirectory::new();
        let u = dir.create(user("a@example.com")).await.unwrap();
        dir.update_credentials(u.principal, "a@example.com", "hash2", Utc::now())
            .await
            .unwrap();
        let found = dir.find_by_email("a@example.com").await.unwrap();
        assert_eq!(found.credential_hash, "hash2");
    }

    #[tokio::test]
    async fn test_directory_update_conflict_and_unknown() {
        let dir = MemoryUserDirectory::new();
        let a = dir.create(user("a@example.com")).await.unwrap();
        dir.create(user("b@example.com")).await.unwrap();

        assert!(matches!(
            dir.update_credentials(a.principal, "b@example.com", "h", Utc::now())
                .await,
            Err(StoreError::Conflict)
        ));
        assert!(matches!(
            dir.update_credentials(Principal::new_v4(), "c@example.com", "h", Utc::now())
                .await,
            Err(StoreError::NotFound)
        ));
        // Failed update leaves the original in place
        assert_eq!(dir.find_by_email("a@example.com").await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_refresh_store_lifecycle() {
        let store = MemoryRefreshStore::new();
        let now = Utc::now();
        let rt = RefreshToken::new("abc".into(), Principal::new_v4(), now);

        store.create(rt.clone()).await.unwrap();
        assert_eq!(store.lookup("abc").await.unwrap(), rt);

        store.revoke("abc", now).await.unwrap();
        assert_eq!(store.lookup("abc").await.unwrap().revoked_at, Some(now));
    }

    #[tokio::test]
    async fn test_refresh_store_unknown_token() {
        let store = MemoryRefreshStore::new();
        assert!(matches!(store.lookup("nope").await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.revoke("nope", Utc::now()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_refresh_store_tokens_are_independent() {
        let store = MemoryRefreshStore::new();
        let user = Principal::new_v4();
        let now = Utc::now();
        store
            .create(RefreshToken::new("device-a".into(), user, now))
            .await
            .unwrap();
        store
            .create(RefreshToken::new("device-b".into(), user, now))
            .await
            .unwrap();

        store.revoke("device-a", now).await.unwrap();
        assert!(store.lookup("device-a").await.unwrap().revoked_at.is_some());
        assert!(store.lookup("device-b").await.unwrap().revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_store_concurrent_revoke() {
        let store = Arc::new(MemoryRefreshStore::new());
        let now = Utc::now();
        store
            .create(RefreshToken::new("shared".into(), Principal::new_v4(), now))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.revoke("shared", Utc::now()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(store.lookup("shared").await.unwrap().revoked_at.is_some());
    }
}
