//! Refresh tokens.
//!
//! Opaque 256-bit random strings, hex encoded. Persistence belongs to an
//! external collaborator behind [`RefreshTokenStore`]; this module owns
//! generation and the usability rule.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;

use super::error::StoreError;
use crate::core_types::Principal;

/// Random bytes per token (hex doubles it to 64 chars).
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Fixed refresh token lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

pub fn refresh_token_ttl() -> Duration {
    Duration::days(REFRESH_TOKEN_TTL_DAYS)
}

/// Persisted refresh token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub principal: Principal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// New, unrevoked token with `expires_at = created_at + 60 days`.
    pub fn new(token: String, principal: Principal, created_at: DateTime<Utc>) -> Self {
        Self {
            token,
            principal,
            created_at,
            expires_at: created_at + refresh_token_ttl(),
            revoked_at: None,
        }
    }

    /// Usable at `now` unless past expiry or at/after revocation.
    ///
    /// Revocation takes effect at the revocation instant itself, never before it.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        if now > self.expires_at {
            return false;
        }
        match self.revoked_at {
            Some(revoked_at) => now < revoked_at,
            None => true,
        }
    }
}

/// Generate a fresh token string: 32 bytes from the OS CSPRNG, lowercase hex.
///
/// No uniqueness retry: a collision across 256 bits is not a practical event.
pub fn generate_refresh_token() -> Result<String, rand::Error> {
    let mut key = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut key)?;
    Ok(hex::encode(key))
}

/// Refresh token persistence.
///
/// Each call must be individually atomic. No cross-call transactions are
/// required: a lookup racing a revoke resolves as last-write-wins.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new token. `NotFound` is never returned here.
    async fn create(&self, token: RefreshToken) -> Result<RefreshToken, StoreError>;

    /// Fetch by token string. `NotFound` when no row matches.
    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError>;

    /// Set `revoked_at = at`. `NotFound` when no row matches.
    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}
