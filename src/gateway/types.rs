//! API response types and error codes
//!
//! - `ApiResponse<T>`: Unified success/validation envelope
//! - `ApiError`: Handler error (auth taxonomy or request validation)
//! - `error_codes`: Standard error code constants
//! - Request / response DTOs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthError, UserRecord};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Error returned by gateway handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("invalid request: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => e.into_response(),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(error_codes::INVALID_PARAMETER, msg)),
            )
                .into_response(),
        }
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Register / update credentials request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CredentialsRequest {
    #[validate(email)]
    #[schema(example = "walt@breakingbad.com")]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    #[schema(example = "123456789")]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    #[schema(example = "walt@breakingbad.com")]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Event name that grants Chirpy Red
pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// Payment provider (Polka) webhook body
#[derive(Debug, Deserialize, ToSchema)]
pub struct PolkaWebhookRequest {
    #[schema(example = "user.upgraded")]
    pub event: String,
    pub data: PolkaWebhookData,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PolkaWebhookData {
    pub user_id: Uuid,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Public view of a user (never the credential hash)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: *user.principal.as_uuid(),
            email: user.email.clone(),
            is_chirpy_red: user.is_chirpy_red,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Access token (JWT)
    pub token: String,
    /// Opaque refresh token
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "dev")]
    pub platform: String,
    /// Server time (ms since epoch)
    pub timestamp_ms: i64,
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;

    // Server errors (5xxx)
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}
