//! HTTP handlers for the user and session routes.

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use validator::Validate;

use super::state::AppState;
use super::types::{
    ApiError, ApiResponse, CredentialsRequest, HealthResponse, LoginRequest, LoginResponse,
    PolkaWebhookRequest, TokenResponse, USER_UPGRADED_EVENT, UserResponse, error_codes,
};
use crate::core_types::Principal;

/// Health check
///
/// GET /api/healthz
#[utoipa::path(
    get,
    path = "/api/healthz",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>),
        (status = 503, description = "Database unreachable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    if let Some(db) = &state.pg_db {
        if let Err(e) = db.health_check().await {
            tracing::error!("[HEALTH] PostgreSQL ping failed: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    code: error_codes::SERVICE_UNAVAILABLE,
                    msg: "database unavailable".to_string(),
                    data: None,
                }),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            status: "ok".to_string(),
            platform: state.platform.clone(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        })),
    )
}

/// Register a new user
///
/// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    req.validate()?;
    let user = state.sessions.register(&req.email, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from(&user))),
    ))
}

/// Replace the caller's email and password
///
/// PUT /api/users
#[utoipa::path(
    put,
    path = "/api/users",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid email or password"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    req.validate()?;
    let user = state
        .sessions
        .update_credentials(principal, &req.email, &req.password)
        .await?;
    Ok(Json(ApiResponse::success(UserResponse::from(&user))))
}

/// Log in with email and password
///
/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens issued", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Incorrect email or password"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Sessions"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    req.validate()?;
    let outcome = state.sessions.login(&req.email, &req.password).await?;
    Ok(Json(ApiResponse::success(LoginResponse {
        user: UserResponse::from(&outcome.user),
        token: outcome.access_token,
        refresh_token: outcome.refresh_token.token,
        refresh_token_expires_at: outcome.refresh_token.expires_at,
    })))
}

/// Exchange a refresh token for a new access token
///
/// POST /api/refresh
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "New access token", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Missing Authorization header"),
        (status = 401, description = "Unknown, expired or revoked refresh token")
    ),
    security(("bearer_refresh" = [])),
    tag = "Sessions"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let token = state.sessions.refresh(&headers).await?;
    Ok(Json(ApiResponse::success(TokenResponse { token })))
}

/// Revoke a refresh token
///
/// POST /api/revoke
#[utoipa::path(
    post,
    path = "/api/revoke",
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 400, description = "Missing Authorization header"),
        (status = 404, description = "Unknown refresh token")
    ),
    security(("bearer_refresh" = [])),
    tag = "Sessions"
)]
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke(&headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payment webhook: grant Chirpy Red
///
/// POST /api/polka/webhooks
#[utoipa::path(
    post,
    path = "/api/polka/webhooks",
    request_body = PolkaWebhookRequest,
    responses(
        (status = 204, description = "Event handled or ignored"),
        (status = 401, description = "Missing or wrong API key"),
        (status = 404, description = "Unknown user")
    ),
    security(("polka_api_key" = [])),
    tag = "Webhooks"
)]
pub async fn polka_webhook(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PolkaWebhookRequest>,
) -> Result<StatusCode, ApiError> {
    if req.event != USER_UPGRADED_EVENT {
        tracing::debug!(event = %req.event, "Webhook event ignored");
        return Ok(StatusCode::NO_CONTENT);
    }
    state
        .sessions
        .upgrade_membership(Principal::from_uuid(req.data.user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
