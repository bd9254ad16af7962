pub mod api;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod gateway;
pub mod jwt;
pub mod revocation;
pub mod routes;
pub mod time;
pub mod validator;

use std::sync::Arc;

use api::create_api_router;
use axum::{Router, middleware};
use db::Database;
use gateway::{GatewayState, authentication_gateway};
use jwt::JwtConfig;
use revocation::SqliteRevocationList;
use routes::RouteClassifier;
use validator::TokenValidator;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Shared secret for signing and verifying tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: u32,
    /// Path patterns exempt from authentication
    pub open_endpoints: Vec<String>,
}

/// Create the application router with the given configuration.
///
/// Every route, known or not, sits behind the authentication gateway;
/// only the configured open endpoints bypass it.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        &config.jwt_secret,
        config.access_token_ttl_secs,
    ));

    let gateway_state = GatewayState {
        routes: Arc::new(RouteClassifier::new(config.open_endpoints.clone())),
        validator: Arc::new(TokenValidator::new(
            Arc::new(SqliteRevocationList::new(config.db.clone())),
            jwt.clone(),
        )),
    };

    create_api_router(config.db.clone(), jwt, config.refresh_token_ttl_days).layer(
        middleware::from_fn_with_state(gateway_state, authentication_gateway),
    )
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}
