use std::sync::Arc;

use crate::auth::SessionService;
use crate::db::Database;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Login / authenticate / refresh / revoke
    pub sessions: Arc<SessionService>,
    /// Deployment platform name, reported by the health check
    pub platform: String,
    /// PostgreSQL pool when running against a database
    pub pg_db: Option<Database>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionService>, platform: impl Into<String>) -> Self {
        Self {
            sessions,
            platform: platform.into(),
            pg_db: None,
        }
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.pg_db = Some(db);
        self
    }
}
