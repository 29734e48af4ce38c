//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::types::{
    CredentialsRequest, HealthResponse, LoginRequest, LoginResponse, PolkaWebhookData,
    PolkaWebhookRequest, TokenResponse, UserResponse,
};

/// Bearer schemes (access JWT, opaque refresh token) and the webhook API key.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from POST /api/login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "bearer_refresh",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Refresh token from POST /api/login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "polka_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "ApiKey <key>",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chirpy Auth API",
        version = "1.0.0",
        description = "User registration, login and session tokens for Chirpy.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::register,
        crate::gateway::handlers::update_user,
        crate::gateway::handlers::login,
        crate::gateway::handlers::refresh,
        crate::gateway::handlers::revoke,
        crate::gateway::handlers::polka_webhook,
    ),
    components(
        schemas(
            HealthResponse,
            CredentialsRequest,
            LoginRequest,
            UserResponse,
            LoginResponse,
            TokenResponse,
            PolkaWebhookRequest,
            PolkaWebhookData,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Account registration and credential changes"),
        (name = "Sessions", description = "Login, token refresh and revocation"),
        (name = "Webhooks", description = "Payment provider callbacks"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
