mod auth;
mod error;
mod me;

use std::sync::Arc;

use axum::{Json, Router, routing::get};

use crate::db::Database;
use crate::jwt::JwtConfig;

pub use error::{ApiError, ResultExt};

/// Create the API router: credential flows, a liveness probe, and a
/// stand-in downstream endpoint behind the gateway.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, refresh_token_ttl_days: u32) -> Router {
    let auth_state = auth::AuthState {
        db,
        jwt,
        refresh_token_ttl_days,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .route("/api/me", get(me::me))
        .route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
