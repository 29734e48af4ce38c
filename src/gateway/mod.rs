//! HTTP gateway hosting the session core.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use anyhow::Context;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

/// Build the full router: public routes, JWT-protected routes, the API-key
/// webhook and Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Protected by access token
    // ==========================================================================
    let user_routes = Router::new()
        .route("/users", put(handlers::update_user))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::jwt_auth_middleware,
        ));

    // ==========================================================================
    // Protected by the static API key
    // ==========================================================================
    let webhook_routes = Router::new()
        .route("/polka/webhooks", post(handlers::polka_webhook))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::api_key_middleware,
        ));

    // ==========================================================================
    // Public (refresh / revoke read their own token from the header)
    // ==========================================================================
    let public_routes = Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/users", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/revoke", post(handlers::revoke));

    Router::new()
        .nest(
            "/api",
            public_routes.merge(user_routes).merge(webhook_routes),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the process is stopped.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (port in use?)", addr))?;

    tracing::info!(%addr, "Gateway listening");
    println!("🚀 Gateway listening on http://{}", addr);
    println!("📖 API Docs: http://{}/docs", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
