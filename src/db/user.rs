//! User persistence consumed by the login and registration flows.
//!
//! The gateway core never touches this store; it only sees the principal a
//! token carries. Handlers look users up here to mint those tokens.

use sqlx::sqlite::SqlitePool;

/// A persisted user identity.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    /// Comma-separated role list, e.g. "USER" or "USER,HOST".
    pub roles: String,
    pub created_at: String,
}

pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user. Fails when the email is already taken.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        roles: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (email, password_hash, roles) VALUES (?, ?, ?)")
                .bind(email)
                .bind(password_hash)
                .bind(roles)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<(i64, String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, password_hash, roles, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_user))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<(i64, String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, password_hash, roles, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_user))
    }
}

fn into_user(
    (id, email, password_hash, roles, created_at): (i64, String, String, String, String),
) -> User {
    User {
        id,
        email,
        password_hash,
        roles,
        created_at,
    }
}
