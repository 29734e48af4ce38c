//! PostgreSQL refresh token store.
//!
//! Each method is a single statement, so each is atomic on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, SafeRow};
use crate::auth::error::StoreError;
use crate::auth::refresh::{RefreshToken, RefreshTokenStore};
use crate::core_types::Principal;

pub struct PgRefreshTokenStore {
    db: Database,
}

impl PgRefreshTokenStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_token(row: &sqlx::postgres::PgRow) -> Result<RefreshToken, sqlx::Error> {
        Ok(RefreshToken {
            token: row.require("token")?,
            principal: Principal::from_uuid(row.require::<Uuid>("user_id")?),
            created_at: row.require("created_at")?,
            expires_at: row.require("expires_at")?,
            // NULL is "not revoked"; an unreadable value is an error, never NULL
            revoked_at: row.require::<Option<DateTime<Utc>>>("revoked_at")?,
        })
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, token: RefreshToken) -> Result<RefreshToken, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $3, $4, NULL)
            RETURNING token, user_id, created_at, expires_at, revoked_at
            "#,
        )
        .bind(&token.token)
        .bind(*token.principal.as_uuid())
        .bind(token.created_at)
        .bind(token.expires_at)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Self::row_to_token(&row)?)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT token, user_id, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(Self::row_to_token(&row)?)
    }

    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $2, updated_at = $2
            WHERE token = $1
            "#,
        )
        .bind(token)
        .bind(at)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
