//! Revocation checking against external state.
//!
//! The check fails closed: when the backing store cannot be consulted, a
//! token is treated as revoked rather than letting the failure propagate.
//! Infrastructure errors never cross this boundary.

use async_trait::async_trait;

use crate::db::Database;

/// Capability interface for the revocation check. One production
/// implementation ([`SqliteRevocationList`]); tests swap in fixed doubles.
#[async_trait]
pub trait RevocationList: Send + Sync {
    /// Whether the token has been explicitly invalidated. Must not error:
    /// an unreachable backend reads as `true`.
    async fn is_blacklisted(&self, token: &str) -> bool;
}

/// Revocation list backed by the `revoked_tokens` table.
pub struct SqliteRevocationList {
    db: Database,
}

impl SqliteRevocationList {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RevocationList for SqliteRevocationList {
    async fn is_blacklisted(&self, token: &str) -> bool {
        match self.db.revoked_tokens().exists(token).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, "Revocation list unreachable, failing closed");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::unix_now;

    #[tokio::test]
    async fn test_unknown_token_is_not_blacklisted() {
        let db = Database::open(":memory:").await.unwrap();
        let list = SqliteRevocationList::new(db);

        assert!(!list.is_blacklisted("some-token").await);
    }

    #[tokio::test]
    async fn test_revoked_token_is_blacklisted() {
        let db = Database::open(":memory:").await.unwrap();
        db.revoked_tokens()
            .insert("some-token", unix_now() + 300)
            .await
            .unwrap();
        let list = SqliteRevocationList::new(db);

        assert!(list.is_blacklisted("some-token").await);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_closed() {
        let db = Database::open(":memory:").await.unwrap();
        let list = SqliteRevocationList::new(db.clone());

        db.close().await;

        assert!(list.is_blacklisted("any-token").await);
    }
}
