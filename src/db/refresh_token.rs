//! Refresh token records with an explicit expiry/revocation lifecycle.
//!
//! A record is ACTIVE when created, becomes expired purely by the passage of
//! time (computed on read, never stored as a flag), and can be revoked
//! explicitly, which is terminal. The only permitted mutation after creation
//! is `revoke`. Records are destroyed only by the bulk `delete_expired`
//! housekeeping pass, never as a side effect of use.

use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::time::{now_sqlite_datetime, sqlite_datetime, unix_now};

/// A persisted refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    /// Opaque token value: UUID v4, 122 bits of entropy.
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
    pub revoked: bool,
    pub created_at: String,
    pub revoked_at: Option<String>,
}

impl RefreshTokenRecord {
    /// Whether the current time is past `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= now_sqlite_datetime()
    }

    /// Not expired and not revoked.
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.revoked
    }
}

/// Store for refresh token records.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

type RecordRow = (i64, String, i64, String, i64, String, Option<String>);

const RECORD_COLUMNS: &str = "id, token, user_id, expires_at, revoked, created_at, revoked_at";

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a record for a user with a day-count TTL.
    ///
    /// Panics when `ttl_days` is zero: that is a caller bug, not a runtime
    /// condition to recover from.
    pub async fn create(
        &self,
        user_id: i64,
        ttl_days: u32,
    ) -> Result<RefreshTokenRecord, sqlx::Error> {
        assert!(ttl_days > 0, "refresh token TTL must be positive");

        let token = Uuid::new_v4().to_string();
        let now = unix_now();
        let created_at = sqlite_datetime(now);
        let expires_at = sqlite_datetime(now + u64::from(ttl_days) * 86_400);

        let result = sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(&expires_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(RefreshTokenRecord {
            id: result.last_insert_rowid(),
            token,
            user_id,
            expires_at,
            revoked: false,
            created_at,
            revoked_at: None,
        })
    }

    /// Find a record by its opaque token value.
    pub async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM refresh_tokens WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_record))
    }

    /// All records for a user, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<RefreshTokenRecord>, sqlx::Error> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM refresh_tokens WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    /// Valid (non-expired, non-revoked) records for a user, newest first.
    pub async fn list_valid_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<RefreshTokenRecord>, sqlx::Error> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM refresh_tokens \
             WHERE user_id = ? AND revoked = 0 AND expires_at > datetime('now') \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    /// Revoke a record: set the flag and stamp `revoked_at`.
    ///
    /// Revoking an already-revoked record overwrites `revoked_at`.
    /// Returns whether a record was affected.
    pub async fn revoke(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1, revoked_at = ? WHERE token = ?")
                .bind(now_sqlite_datetime())
                .bind(token)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether a record with this token exists and is currently valid.
    pub async fn exists_and_valid(&self, token: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM refresh_tokens \
             WHERE token = ? AND revoked = 0 AND expires_at > datetime('now')",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Delete a record by token value.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all records for a user (logout everywhere).
    pub async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Bulk-delete records past expiry. Periodic housekeeping, not part of
    /// the request-serving path.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn into_record(
    (id, token, user_id, expires_at, revoked, created_at, revoked_at): RecordRow,
) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id,
        token,
        user_id,
        expires_at,
        revoked: revoked != 0,
        created_at,
        revoked_at,
    }
}
