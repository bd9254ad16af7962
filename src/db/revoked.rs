//! Denylist of explicitly invalidated access tokens.
//!
//! Keyed by the raw token string. An entry only needs to outlive the
//! token's natural expiry, so inserts carry that expiry and housekeeping
//! drops entries past it.

use sqlx::sqlite::SqlitePool;

use crate::time::sqlite_datetime;

pub struct RevokedTokenStore {
    pool: SqlitePool,
}

impl RevokedTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark a token revoked until its natural expiry (Unix seconds).
    pub async fn insert(&self, token: &str, expires_at: u64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR REPLACE INTO revoked_tokens (token, expires_at) VALUES (?, ?)")
            .bind(token)
            .bind(sqlite_datetime(expires_at))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Key-existence lookup by raw token string.
    pub async fn exists(&self, token: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Drop entries whose token has expired anyway.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
