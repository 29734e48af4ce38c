//! Session orchestration.
//!
//! Composes the hasher, the access token codec, the refresh token store and
//! the user directory into login / authenticate / refresh / revoke. There is
//! no session object: every call stands alone and only the stores hold state.
//!
//! All lower-layer failures are logged here and folded into [`AuthError`].

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;

use axum::http::HeaderMap;
use tokio::sync::OnceCell;

use super::directory::{UserDirectory, UserRecord};
use super::error::{AuthError, HashError, StoreError, TokenError};
use super::extract::{extract_api_key, extract_bearer};
use super::jwt::AccessTokenCodec;
use super::password::CredentialHasher;
use super::refresh::{RefreshToken, RefreshTokenStore, generate_refresh_token};
use crate::clock::Clock;
use crate::core_types::Principal;

/// Session policy knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Access token lifetime on login
    pub access_token_ttl: Duration,
    /// Access token lifetime when minted from a refresh token
    pub refresh_access_token_ttl: Duration,
    /// Upper bound on any single storage call
    pub store_timeout: std::time::Duration,
    /// Static API key for `Authorization: ApiKey` callers; `None` disables them
    pub api_key: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::hours(1),
            refresh_access_token_ttl: Duration::hours(1),
            store_timeout: std::time::Duration::from_secs(5),
            api_key: None,
        }
    }
}

/// A refresh token handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserRecord,
    pub access_token: String,
    pub refresh_token: IssuedRefreshToken,
}

/// Password verified against the dummy hash when an email is unknown.
const DUMMY_PASSWORD: &str = "chirpy-unknown-user";

pub struct SessionService {
    config: SessionConfig,
    hasher: CredentialHasher,
    /// Hash with the live parameters; unknown-email logins pay the same verify cost
    dummy_hash: OnceCell<String>,
    codec: AccessTokenCodec,
    users: Arc<dyn UserDirectory>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    /// The codec is re-bound to `clock` so issue and verify share one time source.
    pub fn new(
        config: SessionConfig,
        hasher: CredentialHasher,
        codec: AccessTokenCodec,
        users: Arc<dyn UserDirectory>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dummy_hash = match hasher.hash(DUMMY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(error = %e, "Dummy credential hash deferred");
                None
            }
        };
        Self {
            config,
            hasher,
            dummy_hash: OnceCell::new_with(dummy_hash),
            codec: codec.with_clock(clock.clone()),
            users,
            refresh_tokens,
            clock,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Credential hashing
    // ------------------------------------------------------------------

    /// Hash a password off the async dispatcher.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let result = self
            .run_blocking(move |hasher| hasher.hash(&password))
            .await?;
        result.map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            AuthError::InternalFailure
        })
    }

    /// Verify a password off the async dispatcher.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let result = self
            .run_blocking(move |hasher| hasher.verify(&password, &hash))
            .await?;
        result.map_err(|e| {
            tracing::error!(error = %e, "Stored credential hash unusable");
            AuthError::InternalFailure
        })
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<Result<T, HashError>, AuthError>
    where
        F: FnOnce(CredentialHasher) -> Result<T, HashError> + Send + 'static,
        T: Send + 'static,
    {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || f(hasher))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Hashing task aborted");
                AuthError::InternalFailure
            })
    }

    // ------------------------------------------------------------------
    // Access tokens
    // ------------------------------------------------------------------

    pub fn issue_access_token(
        &self,
        principal: Principal,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        self.codec
            .issue(principal, ttl)
            .map_err(|_| AuthError::InternalFailure)
    }

    /// Verify an access token. Every failure is `Unauthenticated`.
    pub fn verify_access_token(&self, token: &str) -> Result<Principal, AuthError> {
        self.codec.verify(token).map_err(|e: TokenError| {
            tracing::debug!(reason = %e, "Access token rejected");
            AuthError::Unauthenticated
        })
    }

    // ------------------------------------------------------------------
    // Refresh tokens
    // ------------------------------------------------------------------

    /// Mint and persist a refresh token (60-day TTL).
    pub async fn issue_refresh_token(
        &self,
        principal: Principal,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let token = generate_refresh_token().map_err(|e| {
            tracing::error!(error = %e, "Entropy source failed");
            AuthError::InternalFailure
        })?;

        let row = RefreshToken::new(token, principal, self.clock.now());
        let stored = self
            .bounded(self.refresh_tokens.create(row))
            .await
            .map_err(|e| {
                tracing::error!(principal = %principal, error = %e, "Failed to persist refresh token");
                AuthError::InternalFailure
            })?;

        Ok(IssuedRefreshToken {
            token: stored.token,
            expires_at: stored.expires_at,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token is not rotated. The new access token gets the fixed
    /// `refresh_access_token_ttl`.
    pub async fn refresh_access_token(&self, token: &str) -> Result<String, AuthError> {
        let row = match self.bounded(self.refresh_tokens.lookup(token)).await {
            Ok(row) => row,
            Err(StoreError::NotFound) => {
                tracing::debug!("Refresh with unknown token");
                return Err(AuthError::Unauthenticated);
            }
            Err(e) => {
                tracing::error!(error = %e, "Refresh token lookup failed");
                return Err(AuthError::InternalFailure);
            }
        };

        let now = self.clock.now();
        if !row.is_usable_at(now) {
            tracing::debug!(
                principal = %row.principal,
                expired = now > row.expires_at,
                revoked = row.revoked_at.is_some(),
                "Refresh token unusable"
            );
            return Err(AuthError::Unauthenticated);
        }

        self.issue_access_token(row.principal, self.config.refresh_access_token_ttl)
    }

    /// Revoke a refresh token now.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), AuthError> {
        let now = self.clock.now();
        match self.bounded(self.refresh_tokens.revoke(token, now)).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(AuthError::NotFound),
            Err(e) => {
                tracing::error!(error = %e, "Refresh token revoke failed");
                Err(AuthError::InternalFailure)
            }
        }
    }

    // ------------------------------------------------------------------
    // Request-level operations
    // ------------------------------------------------------------------

    /// Log in with email + password.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let user = match self.bounded(self.users.find_by_email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.burn_verify(password).await;
                tracing::info!("Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(error = %e, "User lookup failed");
                return Err(AuthError::InternalFailure);
            }
        };

        if !self.verify_password(password, &user.credential_hash).await? {
            tracing::info!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.issue_access_token(user.principal, self.config.access_token_ttl)?;
        let refresh_token = self.issue_refresh_token(user.principal).await?;

        tracing::info!(principal = %user.principal, "Login succeeded");
        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Run one verify against the dummy hash so an unknown email costs the same
    /// as a wrong password.
    async fn burn_verify(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
            .await;
        if let Ok(hash) = dummy {
            let _ = self.verify_password(password, hash).await;
        }
    }

    /// Resolve the principal behind a protected request.
    ///
    /// Only access tokens are accepted; a refresh token in the header fails.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = extract_bearer(headers).map_err(|_| AuthError::Unauthenticated)?;
        self.verify_access_token(&token)
    }

    /// `Authorization: Bearer <refresh token>` -> new access token.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let token = extract_bearer(headers)?;
        self.refresh_access_token(&token).await
    }

    /// `Authorization: Bearer <refresh token>` -> revoked.
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = extract_bearer(headers)?;
        self.revoke_refresh_token(&token).await
    }

    /// Check `Authorization: ApiKey <key>` against the configured key.
    pub fn authenticate_api_key(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(expected) = self.config.api_key.as_deref() else {
            return Err(AuthError::Unauthenticated);
        };
        if expected.is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        let presented = extract_api_key(headers).map_err(|_| AuthError::Unauthenticated)?;
        if presented.is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::Unauthenticated)
        }
    }

    // ------------------------------------------------------------------
    // Account credentials
    // ------------------------------------------------------------------

    /// Create a user with a freshly hashed password.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let credential_hash = self.hash_password(password).await?;
        let now = self.clock.now();
        let user = UserRecord {
            principal: Principal::new_v4(),
            email: email.to_string(),
            credential_hash,
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        };

        match self.bounded(self.users.create(user)).await {
            Ok(user) => {
                tracing::info!(principal = %user.principal, "User registered");
                Ok(user)
            }
            Err(StoreError::Conflict) => Err(AuthError::Conflict),
            Err(e) => {
                tracing::error!(error = %e, "User registration failed");
                Err(AuthError::InternalFailure)
            }
        }
    }

    /// Replace a user's email and password hash.
    pub async fn update_credentials(
        &self,
        principal: Principal,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let credential_hash = self.hash_password(password).await?;
        let now = self.clock.now();

        match self
            .bounded(
                self.users
                    .update_credentials(principal, email, &credential_hash, now),
            )
            .await
        {
            Ok(user) => {
                tracing::info!(principal = %principal, "User credentials updated");
                Ok(user)
            }
            Err(StoreError::NotFound) => Err(AuthError::Unauthenticated),
            Err(StoreError::Conflict) => Err(AuthError::Conflict),
            Err(e) => {
                tracing::error!(principal = %principal, error = %e, "Credential update failed");
                Err(AuthError::InternalFailure)
            }
        }
    }

    /// Mark a user as a Chirpy Red member (payment webhook).
    pub async fn upgrade_membership(&self, principal: Principal) -> Result<UserRecord, AuthError> {
        let now = self.clock.now();
        match self
            .bounded(self.users.upgrade_membership(principal, now))
            .await
        {
            Ok(user) => {
                tracing::info!(principal = %principal, "User upgraded to Chirpy Red");
                Ok(user)
            }
            Err(StoreError::NotFound) => Err(AuthError::NotFound),
            Err(e) => {
                tracing::error!(principal = %principal, error = %e, "Membership upgrade failed");
                Err(AuthError::InternalFailure)
            }
        }
    }

    /// Bound a storage call by `store_timeout`. Dropping the future cancels the I/O.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

/// Length leaks; content does not.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
