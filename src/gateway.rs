//! Per-request authentication filter.
//!
//! Each request reaches exactly one terminal outcome:
//! - open path: forwarded unmodified,
//! - missing/malformed credentials: rejected inline, the validator is
//!   never invoked,
//! - valid token: forwarded with `X-User-*` identity headers attached,
//! - invalid token: rejected with a sanitized classification message,
//! - anything unanticipated: rejected with a fixed 500 message.
//!
//! Classification and extraction run inline; validation is the single
//! suspension point (see `validator`).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::{AuthTokenError, Principal};
use crate::routes::RouteClassifier;
use crate::time::{iso8601, unix_now};
use crate::validator::TokenValidator;

/// Identity headers attached to forwarded requests.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

const MISSING_HEADER_MESSAGE: &str = "Missing or invalid Authorization header";
const EMPTY_TOKEN_MESSAGE: &str = "Empty token";

/// Shared, immutable state for the filter. Cheap to clone per request.
#[derive(Clone)]
pub struct GatewayState {
    pub routes: Arc<RouteClassifier>,
    pub validator: Arc<TokenValidator>,
}

/// Structured rejection body returned for every gateway rejection.
#[derive(Debug, Serialize)]
pub struct RejectionBody {
    pub message: String,
    pub path: String,
    pub status: u16,
    pub timestamp: String,
}

/// The authentication middleware. Layered over the whole router.
pub async fn authentication_gateway(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    if !state.routes.is_secured(&path) {
        return next.run(request).await;
    }

    let token = match bearer_token(request.headers()) {
        Ok(token) => token,
        Err(message) => return reject(StatusCode::UNAUTHORIZED, message, &path),
    };

    match state.validator.validate_token(&token).await {
        Ok(principal) => match enrich(request.headers_mut(), &principal) {
            Ok(()) => next.run(request).await,
            Err(()) => {
                tracing::error!(path = %path, "Principal not encodable as identity headers");
                reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    AuthTokenError::Unexpected.message(),
                    &path,
                )
            }
        },
        Err(AuthTokenError::Unexpected) => {
            tracing::error!(path = %path, "Token validation failed unexpectedly");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                AuthTokenError::Unexpected.message(),
                &path,
            )
        }
        Err(classified) => reject(StatusCode::UNAUTHORIZED, classified.message(), &path),
    }
}

/// Extract the bearer token. The `Bearer ` prefix is literal:
/// case-sensitive, single space.
fn bearer_token(headers: &HeaderMap) -> Result<String, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(MISSING_HEADER_MESSAGE)?;

    let token = value.strip_prefix("Bearer ").ok_or(MISSING_HEADER_MESSAGE)?;
    if token.is_empty() {
        return Err(EMPTY_TOKEN_MESSAGE);
    }
    Ok(token.to_string())
}

/// Attach identity headers, replacing any inbound values.
///
/// Inbound `X-User-*` headers are untrusted and removed up front, so they
/// never survive regardless of what happens afterwards. Fails when a
/// principal field cannot be encoded as a header value; the caller must
/// reject the request rather than forward it half-enriched.
fn enrich(headers: &mut HeaderMap, principal: &Principal) -> Result<(), ()> {
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_EMAIL_HEADER);
    headers.remove(USER_ROLES_HEADER);

    let user_id = HeaderValue::from_str(&principal.user_id).map_err(|_| ())?;
    headers.insert(USER_ID_HEADER, user_id);

    if let Some(email) = principal.email.as_deref() {
        let value = HeaderValue::from_str(email).map_err(|_| ())?;
        headers.insert(USER_EMAIL_HEADER, value);
    }

    let roles = HeaderValue::from_str(&principal.roles_header()).map_err(|_| ())?;
    headers.insert(USER_ROLES_HEADER, roles);
    Ok(())
}

fn reject(status: StatusCode, message: &str, path: &str) -> Response {
    let body = RejectionBody {
        message: message.to_string(),
        path: path.to_string(),
        status: status.as_u16(),
        timestamp: iso8601(unix_now()),
    };
    (status, Json(body)).into_response()
}
