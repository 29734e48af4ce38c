//! Access token codec.
//!
//! Compact JWS (`header.claims.signature`), HS256, keyed by the process-wide
//! signing secret. Tokens are stateless: nothing is stored and nothing is
//! revoked, validity is signature + timestamps at verification time.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::TokenError;
use crate::clock::{Clock, SystemClock};
use crate::core_types::Principal;

/// Fixed `iss` claim.
pub const ISSUER: &str = "chirpy";

/// Default ceiling on access token lifetime.
pub const DEFAULT_MAX_TTL_SECS: i64 = 24 * 3600;

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer (service name)
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Subject (principal as string)
    #[serde(default)]
    pub sub: String,
}

/// Mints and verifies access tokens.
#[derive(Clone)]
pub struct AccessTokenCodec {
    issuer: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    max_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AccessTokenCodec {
    pub fn new(secret: &str, issuer: impl Into<String>, max_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock with no leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            issuer: issuer.into(),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            max_ttl,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for both issue and verify.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_ttl(&self) -> Duration {
        self.max_ttl
    }

    /// Issue a token for `principal` expiring `ttl` from now.
    ///
    /// `ttl` is clamped to the configured maximum. A negative `ttl` yields an
    /// already-expired token; one that underflows the calendar is `InvalidToken`.
    pub fn issue(&self, principal: Principal, ttl: Duration) -> Result<String, TokenError> {
        let ttl = if ttl > self.max_ttl {
            tracing::debug!(
                requested_secs = ttl.num_seconds(),
                max_secs = self.max_ttl.num_seconds(),
                "Access token TTL clamped"
            );
            self.max_ttl
        } else {
            ttl
        };

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            tracing::warn!(ttl_secs = ttl.num_seconds(), "Access token TTL out of range");
            TokenError::InvalidToken
        })?;
        let claims = AccessClaims {
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            sub: principal.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign access token");
            TokenError::InvalidToken
        })
    }

    /// Verify a token and return its principal.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| map_jwt_error(e.kind()))?;
        let claims = data.claims;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.iss != self.issuer {
            return Err(TokenError::MalformedClaims);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::MalformedClaims);
        }
        claims
            .sub
            .parse::<Principal>()
            .map_err(|_| TokenError::MalformedClaims)
    }
}

fn map_jwt_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature => TokenError::MalformedClaims,
        _ => TokenError::InvalidToken,
    }
}

/// Issue a token with an explicit secret, the fixed issuer and the system clock.
pub fn issue_access_token(
    principal: Principal,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    AccessTokenCodec::new(secret, ISSUER, Duration::seconds(DEFAULT_MAX_TTL_SECS))
        .issue(principal, ttl)
}

/// Verify a token with an explicit secret, the fixed issuer and the system clock.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Principal, TokenError> {
    AccessTokenCodec::new(secret, ISSUER, Duration::seconds(DEFAULT_MAX_TTL_SECS)).verify(token)
}
