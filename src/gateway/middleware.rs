use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;

use crate::auth::AuthError;
use crate::gateway::state::AppState;

/// Require a valid access token and inject its [`Principal`](crate::core_types::Principal)
/// into request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = state.sessions.authenticate(request.headers())?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Require `Authorization: ApiKey <key>` matching the configured key.
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    state.sessions.authenticate_api_key(request.headers())?;
    Ok(next.run(request).await)
}
