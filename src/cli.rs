//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_DAYS};
use clap::Parser;
use tracing::error;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Tidegate",
    about = "Authenticating API gateway with token lifecycle management"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "tidegate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TOKEN_TTL_SECS)]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in days
    #[arg(long, default_value_t = DEFAULT_REFRESH_TOKEN_TTL_DAYS)]
    pub refresh_token_ttl_days: u32,

    /// Path pattern exempt from authentication. Repeat for multiple patterns;
    /// supports `*` (one segment) and `**` (any segments)
    #[arg(
        long = "open-endpoint",
        default_values_t = default_open_endpoints()
    )]
    pub open_endpoints: Vec<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Endpoints that must stay reachable without credentials.
pub fn default_open_endpoints() -> Vec<String> {
    vec![
        "/auth/register".to_string(),
        "/auth/login".to_string(),
        "/auth/refresh".to_string(),
        "/health".to_string(),
    ]
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Open the database, logging on failure.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => Some(db),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_token_ttl_secs: args.access_token_ttl,
        refresh_token_ttl_days: args.refresh_token_ttl_days,
        open_endpoints: args.open_endpoints.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tidegate"]);
        assert_eq!(args.port, 8080);
        assert_eq!(args.access_token_ttl, DEFAULT_ACCESS_TOKEN_TTL_SECS);
        assert_eq!(args.refresh_token_ttl_days, DEFAULT_REFRESH_TOKEN_TTL_DAYS);
        assert_eq!(args.open_endpoints, default_open_endpoints());
    }

    #[test]
    fn test_open_endpoints_override() {
        let args = Args::parse_from([
            "tidegate",
            "--open-endpoint",
            "/public/**",
            "--open-endpoint",
            "/status",
        ]);
        assert_eq!(args.open_endpoints, vec!["/public/**", "/status"]);
    }
}
