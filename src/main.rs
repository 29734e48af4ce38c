//! Chirpy Auth - HTTP entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌────────────┐
//! │  Config  │───▶│ Gateway  │───▶│SessionService│───▶│ Postgres / │
//! │  (YAML)  │    │  (axum)  │    │ (hash, JWT)  │    │  in-memory │
//! └──────────┘    └──────────┘    └──────────────┘    └────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;

use chirpy_auth::auth::{
    CredentialHasher, MemoryRefreshStore, MemoryUserDirectory, RefreshTokenStore, SessionService,
    UserDirectory,
};
use chirpy_auth::clock::SystemClock;
use chirpy_auth::config::AppConfig;
use chirpy_auth::db::{Database, PgRefreshTokenStore, PgUserDirectory};
use chirpy_auth::gateway::{self, AppState};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = chirpy_auth::logging::init_logging(&app_config)?;

    tracing::info!(
        env = %env,
        platform = %app_config.platform,
        git = env!("GIT_HASH"),
        "Starting Chirpy Auth"
    );

    let auth = &app_config.auth;
    let hasher = CredentialHasher::new(auth.password).context("Invalid password hash parameters")?;

    let (users, refresh_tokens, pg_db): (
        Arc<dyn UserDirectory>,
        Arc<dyn RefreshTokenStore>,
        Option<Database>,
    ) = match &app_config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema().await.context("Failed to apply schema")?;
            let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(db.clone()));
            let tokens: Arc<dyn RefreshTokenStore> =
                Arc::new(PgRefreshTokenStore::new(db.clone()));
            (users, tokens, Some(db))
        }
        None => {
            tracing::warn!("No postgres_url configured; using in-memory stores");
            let users: Arc<dyn UserDirectory> = Arc::new(MemoryUserDirectory::new());
            let tokens: Arc<dyn RefreshTokenStore> = Arc::new(MemoryRefreshStore::new());
            (users, tokens, None)
        }
    };

    let sessions = Arc::new(SessionService::new(
        auth.session_config()?,
        hasher,
        auth.token_codec()?,
        users,
        refresh_tokens,
        Arc::new(SystemClock),
    ));

    let mut state = AppState::new(sessions, app_config.platform.clone());
    if let Some(db) = pg_db {
        state = state.with_database(db);
    }

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, Arc::new(state)).await
}
