//! Login, registration and refresh flows that mint the credentials the
//! gateway later verifies.
//!
//! Password hashing is a collaborator concern: the flows here only consume
//! the comparison result.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use crate::db::{Database, User};
use crate::jwt::{DEFAULT_ROLE, JwtConfig, TokenParser};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub refresh_token_ttl_days: u32,
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    email: String,
    access_token: String,
    refresh_token: String,
}

async fn register(
    State(state): State<AuthState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.email.trim().to_string();
    if email.is_empty()
        || !email.contains('@')
        || email.chars().any(|c| c.is_control() || c.is_whitespace())
    {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if body.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    if state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to check existing user")?
        .is_some()
    {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = hash_password(&body.password)?;
    let user_id = state
        .db
        .users()
        .create(&email, &password_hash, DEFAULT_ROLE)
        .await
        .db_err("Failed to create user")?;

    let user = User {
        id: user_id,
        email,
        password_hash,
        roles: DEFAULT_ROLE.to_string(),
        created_at: String::new(),
    };
    let response = issue_credentials(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AuthState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(body.email.trim())
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let response = issue_credentials(&state, &user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Exchange a valid refresh record for a fresh access token. The record is
/// left untouched; it keeps serving until it expires or is revoked.
async fn refresh(
    State(state): State<AuthState>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = state
        .db
        .refresh_tokens()
        .exists_and_valid(&body.refresh_token)
        .await
        .db_err("Failed to check refresh token")?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid refresh token"));
    }

    let record = state
        .db
        .refresh_tokens()
        .get_by_token(&body.refresh_token)
        .await
        .db_err("Failed to load refresh token")?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    let user = state
        .db
        .users()
        .get_by_id(record.user_id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    let issued = state
        .jwt
        .issue_access_token(Some(user.id), &user.email, &user.roles)
        .map_err(|_| ApiError::internal("Failed to issue token"))?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            email: user.email,
            access_token: issued.token,
            refresh_token: body.refresh_token,
        }),
    ))
}

/// Revoke the presented refresh record and put the access token on the
/// revocation list until its natural expiry.
async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Json(body): Json<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .refresh_tokens()
        .revoke(&body.refresh_token)
        .await
        .db_err("Failed to revoke refresh token")?;

    // The request reached here through the gateway, so the bearer token is
    // valid; its expiry bounds how long the denylist entry must live.
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        if let Ok(principal) = state.jwt.parse(token) {
            state
                .db
                .revoked_tokens()
                .insert(token, principal.expiration_time / 1000)
                .await
                .db_err("Failed to blacklist access token")?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn issue_credentials(state: &AuthState, user: &User) -> Result<AuthResponse, ApiError> {
    let issued = state
        .jwt
        .issue_access_token(Some(user.id), &user.email, &user.roles)
        .map_err(|_| ApiError::internal("Failed to issue token"))?;

    let record = state
        .db
        .refresh_tokens()
        .create(user.id, state.refresh_token_ttl_days)
        .await
        .db_err("Failed to create refresh token")?;

    Ok(AuthResponse {
        email: user.email.clone(),
        access_token: issued.token,
        refresh_token: record.token,
    })
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            ApiError::internal("Failed to process credentials")
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
