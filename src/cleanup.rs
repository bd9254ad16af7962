//! Scheduled cleanup tasks for expired credential state.

use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    // Refresh records past expiry
    match db.refresh_tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up refresh tokens: {}", e),
    }

    // Revocation-list entries whose token has expired anyway
    match db.revoked_tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired revocation entries", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up revocation entries: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::unix_now;

    #[tokio::test]
    async fn test_run_cleanup_drops_expired_state() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db
            .users()
            .create("alice@example.com", "hash", "USER")
            .await
            .unwrap();

        let stale = db.refresh_tokens().create(user_id, 7).await.unwrap();
        sqlx::query("UPDATE refresh_tokens SET expires_at = datetime('now', '-1 day') WHERE token = ?")
            .bind(&stale.token)
            .execute(db.pool())
            .await
            .unwrap();
        db.revoked_tokens()
            .insert("stale-access-token", unix_now() - 60)
            .await
            .unwrap();

        run_cleanup(&db).await;

        assert!(
            db.refresh_tokens()
                .get_by_token(&stale.token)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!db.revoked_tokens().exists("stale-access-token").await.unwrap());
    }
}
