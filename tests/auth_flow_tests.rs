//! End-to-end credential lifecycle tests: register, login, refresh, logout,
//! and the revocation effects logout has on both token kinds.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tidegate::{ServerConfig, create_app, db::Database};
use tower::ServiceExt;

const TEST_SECRET: &[u8] = b"test-jwt-secret-at-least-32-bytes!!";

async fn create_test_app() -> (axum::Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_days: 7,
        open_endpoints: tidegate::cli::default_open_endpoints(),
    };
    (create_app(&config), db)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_with_auth(uri: &str, auth: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, auth)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_auth(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &axum::Router, email: &str, password: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            serde_json::json!({"email": email, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_register_returns_credentials() {
    let (app, _db) = create_test_app().await;

    let body = register(&app, "alice@example.com", "correct horse battery").await;

    assert_eq!(body["email"], "alice@example.com");
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_registered_token_grants_access() {
    let (app, _db) = create_test_app().await;

    let body = register(&app, "alice@example.com", "correct horse battery").await;
    let access_token = body["accessToken"].as_str().unwrap();

    let response = app
        .oneshot(get_with_auth(
            "/api/me",
            &format!("Bearer {}", access_token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["roles"], serde_json::json!(["USER"]));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _db) = create_test_app().await;

    register(&app, "alice@example.com", "correct horse battery").await;
    let response = app
        .oneshot(post_json(
            "/auth/register",
            serde_json::json!({"email": "alice@example.com", "password": "another password"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_rejects_weak_input() {
    let (app, _db) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            serde_json::json!({"email": "not-an-email", "password": "long enough pass"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/auth/register",
            serde_json::json!({"email": "alice@example.com", "password": "short"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_control_characters_in_email() {
    let (app, _db) = create_test_app().await;

    for email in ["a\nlice@example.com", "a\rlice@example.com", "a lice@example.com"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/register",
                serde_json::json!({"email": email, "password": "long enough pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_login_round_trip() {
    let (app, _db) = create_test_app().await;

    register(&app, "alice@example.com", "correct horse battery").await;
    let response = app
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({"email": "alice@example.com", "password": "correct horse battery"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_wrong_password_rejected() {
    let (app, _db) = create_test_app().await;

    register(&app, "alice@example.com", "correct horse battery").await;
    let response = app
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({"email": "alice@example.com", "password": "wrong password"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_unknown_email_indistinguishable_from_wrong_password() {
    let (app, _db) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({"email": "nobody@example.com", "password": "whatever pass"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_refresh_mints_new_access_token() {
    let (app, _db) = create_test_app().await;

    let body = register(&app, "alice@example.com", "correct horse battery").await;
    let refresh_token = body["refreshToken"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/refresh",
            serde_json::json!({"refreshToken": refresh_token}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await;
    assert_eq!(refreshed["email"], "alice@example.com");
    // Same record keeps serving; only the access token is new.
    assert_eq!(refreshed["refreshToken"], refresh_token);

    let access_token = refreshed["accessToken"].as_str().unwrap();
    let response = app
        .oneshot(get_with_auth(
            "/api/me",
            &format!("Bearer {}", access_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_unknown_token_rejected() {
    let (app, _db) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/auth/refresh",
            serde_json::json!({"refreshToken": "no-such-token"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid refresh token");
}

#[tokio::test]
async fn test_logout_revokes_both_token_kinds() {
    let (app, _db) = create_test_app().await;

    let body = register(&app, "alice@example.com", "correct horse battery").await;
    let access_token = body["accessToken"].as_str().unwrap().to_string();
    let refresh_token = body["refreshToken"].as_str().unwrap().to_string();
    let auth = format!("Bearer {}", access_token);

    let response = app
        .clone()
        .oneshot(post_json_with_auth(
            "/auth/logout",
            &auth,
            serde_json::json!({"refreshToken": refresh_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The access token is on the revocation list now.
    let response = app
        .clone()
        .oneshot(get_with_auth("/api/me", &auth))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Token revoked");

    // And the refresh record no longer serves.
    let response = app
        .oneshot(post_json(
            "/auth/refresh",
            serde_json::json!({"refreshToken": refresh_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let (app, _db) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/auth/logout",
            serde_json::json!({"refreshToken": "whatever"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_refresh_record_rejected() {
    let (app, db) = create_test_app().await;

    let body = register(&app, "alice@example.com", "correct horse battery").await;
    let refresh_token = body["refreshToken"].as_str().unwrap();

    sqlx::query("UPDATE refresh_tokens SET expires_at = datetime('now', '-1 day') WHERE token = ?")
        .bind(refresh_token)
        .execute(db.pool())
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/auth/refresh",
            serde_json::json!({"refreshToken": refresh_token}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
