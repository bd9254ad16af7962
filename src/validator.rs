//! Facade composing the revocation check and the token parser into one
//! validation decision.

use std::sync::Arc;

use crate::jwt::{AuthTokenError, Principal, TokenParser};
use crate::revocation::RevocationList;

/// Validates bearer tokens: revocation check, then signature verification.
pub struct TokenValidator {
    revocation: Arc<dyn RevocationList>,
    parser: Arc<dyn TokenParser>,
}

impl TokenValidator {
    pub fn new(revocation: Arc<dyn RevocationList>, parser: Arc<dyn TokenParser>) -> Self {
        Self { revocation, parser }
    }

    /// Validate a token and extract its principal.
    ///
    /// The revocation lookup runs first: it is the cheap check, and a
    /// revoked token short-circuits without paying for signature
    /// verification. A token revoked between that check and the
    /// verification below still passes for this one request; that gap is
    /// an accepted tradeoff.
    ///
    /// Verification is CPU-bound, so it runs on the blocking pool. When the
    /// caller's request is dropped mid-flight the task is detached and its
    /// result discarded.
    pub async fn validate_token(&self, token: &str) -> Result<Principal, AuthTokenError> {
        if self.revocation.is_blacklisted(token).await {
            return Err(AuthTokenError::Revoked);
        }

        let parser = Arc::clone(&self.parser);
        let token = token.to_owned();
        match tokio::task::spawn_blocking(move || parser.parse(&token)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Token verification task failed");
                Err(AuthTokenError::Unexpected)
            }
        }
    }
}
