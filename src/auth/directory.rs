//! User directory collaborator.
//!
//! Owned outside the core; the core only resolves users by email and writes
//! credential hashes on registration and credential change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use super::error::StoreError;
use crate::core_types::Principal;

/// A user as seen by the auth core.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub principal: Principal,
    pub email: String,
    /// PHC string. Never logged, never returned to callers.
    pub credential_hash: String,
    /// Paid membership flag, set by the payment webhook
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("principal", &self.principal)
            .field("email", &self.email)
            .field("credential_hash", &"<redacted>")
            .field("is_chirpy_red", &self.is_chirpy_red)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `NotFound` when no user has this email.
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError>;

    /// Insert a new user. `Conflict` when the email is taken.
    async fn create(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    /// Replace email and credential hash wholesale.
    ///
    /// `NotFound` for an unknown principal, `Conflict` when the email belongs
    /// to someone else.
    async fn update_credentials(
        &self,
        principal: Principal,
        email: &str,
        credential_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, StoreError>;

    /// Set the Chirpy Red flag. `NotFound` for an unknown principal.
    async fn upgrade_membership(
        &self,
        principal: Principal,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, StoreError>;
}
