//! Authentication error types.
//!
//! Each layer of the core has its own error enum. The session orchestrator
//! folds all of them into [`AuthError`], the only error that reaches callers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Credential hasher failures.
#[derive(Debug, Error)]
pub enum HashError {
    /// The stored hash string is not a valid PHC string.
    #[error("malformed credential hash: {0}")]
    Malformed(String),

    /// Entropy source or KDF failure.
    #[error("credential hashing failed: {0}")]
    Internal(String),
}

/// Access token verification failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// MAC mismatch. Wrong key, tampering and a missing signature all land here.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token claims are malformed")]
    MalformedClaims,

    /// Structural decode failure (encoding, header, algorithm).
    #[error("invalid token")]
    InvalidToken,
}

/// Credential extractor failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("authorization header missing or empty")]
    MissingHeader,
}

/// Errors reported by the external storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("storage call timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error taxonomy exposed to request handlers.
///
/// Deliberately coarse: nothing here tells a caller which check failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("missing authorization header")]
    MissingHeader,

    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("internal failure")]
    InternalFailure,
}

impl AuthError {
    /// Stable numeric code for the response body.
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidCredentials => 4001,
            Self::Unauthenticated => 4002,
            Self::MissingHeader => 4003,
            Self::NotFound => 4004,
            Self::Conflict => 4009,
            Self::InternalFailure => 5000,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::MissingHeader => "MISSING_HEADER",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::InternalFailure => "INTERNAL_FAILURE",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::MissingHeader => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed user-facing message. Never derived from lower-layer error text.
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Incorrect email or password",
            Self::Unauthenticated => "Unauthorized",
            Self::MissingHeader => "Missing Authorization header",
            Self::NotFound => "Not found",
            Self::Conflict => "Email already in use",
            Self::InternalFailure => "Internal server error",
        }
    }
}

impl From<ExtractError> for AuthError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::MissingHeader => Self::MissingHeader,
        }
    }
}

/// JSON response body for auth errors.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub code: i32,
    pub error: &'static str,
    pub message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorResponse {
            code: self.code(),
            error: self.name(),
            message: self.message(),
        };
        (self.http_status(), Json(body)).into_response()
    }
}
