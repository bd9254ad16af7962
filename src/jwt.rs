//! Signed token issuance and verification.
//!
//! Access tokens are stateless HS256 JWTs: validity is purely a function of
//! signature and expiry. Revocation of individual tokens happens one layer
//! up, against the revocation list (see `revocation`). The same shared
//! secret signs and verifies, so `parse(issue(user))` round-trips.

use std::collections::BTreeSet;
use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::time::unix_now;

/// Role assigned when a token carries no roles claim.
pub const DEFAULT_ROLE: &str = "USER";

/// Access token lifetime when not configured: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh record lifetime when not configured: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: u32 = 7;

/// Validated identity extracted from a token. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject of the token. Non-blank, enforced at parse.
    pub user_id: String,
    /// Email claim, when present.
    pub email: Option<String>,
    /// Roles, never empty. Defaults to [`DEFAULT_ROLE`] when the claim is
    /// absent or blank.
    pub roles: BTreeSet<String>,
    /// Expiration of the token, epoch milliseconds.
    pub expiration_time: u64,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Roles comma-joined for the `X-User-Roles` enrichment header.
    pub fn roles_header(&self) -> String {
        self.roles.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Why a token was rejected. The variants are the full classification a
/// caller can distinguish; internal causes are logged, never carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTokenError {
    /// Expiration claim is in the past.
    Expired,
    /// Signature does not verify against the shared secret.
    BadSignature,
    /// Not a decodable token at all.
    Malformed,
    /// A required claim (subject, expiration) is absent or blank.
    MissingClaim,
    /// Token appears on the revocation list.
    Revoked,
    /// Anything unanticipated. Maps to a 500 at the gateway.
    Unexpected,
}

impl AuthTokenError {
    /// Sanitized message safe to return to clients.
    pub fn message(&self) -> &'static str {
        match self {
            AuthTokenError::Expired => "Token has expired",
            AuthTokenError::BadSignature => "Invalid token signature",
            AuthTokenError::Malformed => "Malformed token",
            AuthTokenError::MissingClaim => "Token is missing a required claim",
            AuthTokenError::Revoked => "Token revoked",
            AuthTokenError::Unexpected => "Authentication service unavailable",
        }
    }
}

impl fmt::Display for AuthTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthTokenError {}

/// Cryptographic token verification. One production implementation
/// ([`JwtConfig`]); tests swap in counting doubles.
pub trait TokenParser: Send + Sync {
    fn parse(&self, token: &str) -> Result<Principal, AuthTokenError>;
}

/// JWT claims. Subject is the user's email; `userId` is only present when
/// the user has a persisted identity. Roles travel as a comma-separated
/// string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles: Option<String>,
    iat: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed token string.
    pub token: String,
    /// Issued-at timestamp, Unix seconds.
    pub issued_at: u64,
    /// Expiration timestamp, Unix seconds.
    pub expires_at: u64,
}

/// Shared-secret JWT configuration: issues and verifies access tokens.
///
/// The secret is injected at construction and immutable afterwards.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: &[u8], access_token_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_ttl_secs,
        }
    }

    /// Mint a signed access token for a user identity.
    ///
    /// Subject is the email. `user_id` is included as a claim only when the
    /// user has a persisted identity. Deterministic given identical inputs
    /// apart from the time-derived claims.
    pub fn issue_access_token(
        &self,
        user_id: Option<i64>,
        email: &str,
        roles: &str,
    ) -> Result<IssuedToken, AuthTokenError> {
        let now = unix_now();
        let expires_at = now + self.access_token_ttl_secs;

        let claims = Claims {
            sub: Some(email.to_string()),
            user_id,
            email: Some(email.to_string()),
            roles: (!roles.trim().is_empty()).then(|| roles.to_string()),
            iat: now,
            exp: Some(expires_at),
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
                tracing::error!(error = %e, "Failed to encode token");
                AuthTokenError::Unexpected
            })?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    pub fn access_token_ttl_secs(&self) -> u64 {
        self.access_token_ttl_secs
    }
}

impl TokenParser for JwtConfig {
    /// Verify the signature and extract a [`Principal`].
    ///
    /// Expiry is enforced by the same decode that verifies the signature,
    /// so an expired token always classifies as `Expired`, never as a
    /// generic failure.
    fn parse(&self, token: &str) -> Result<Principal, AuthTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(classify_decode_error)?;
        let claims = data.claims;

        let user_id = claims
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthTokenError::MissingClaim)?;

        let expires_at = claims.exp.ok_or(AuthTokenError::MissingClaim)?;

        let roles: BTreeSet<String> = match claims.roles.as_deref() {
            Some(list) if !list.trim().is_empty() => list
                .split(',')
                .map(|role| role.trim().to_string())
                .filter(|role| !role.is_empty())
                .collect(),
            _ => BTreeSet::from([DEFAULT_ROLE.to_string()]),
        };

        Ok(Principal {
            user_id,
            email: claims.email,
            roles,
            expiration_time: expires_at.saturating_mul(1000),
        })
    }
}

fn classify_decode_error(e: jsonwebtoken::errors::Error) -> AuthTokenError {
    use jsonwebtoken::errors::ErrorKind;

    tracing::debug!(error = %e, "Token rejected");
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthTokenError::Expired,
        ErrorKind::InvalidSignature => AuthTokenError::BadSignature,
        ErrorKind::MissingRequiredClaim(_) => AuthTokenError::MissingClaim,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthTokenError::Malformed,
        _ => AuthTokenError::Unexpected,
    }
}
