//! Audience-scoped token verification.
//!
//! The verifier is the one place where a bearer token is turned into an
//! authorization outcome. All failure modes come back as values - a
//! [`Decision`] or an [`AuthError`] - never as panics, and a malformed
//! token costs no cryptographic work.
//!
//! # Security
//!
//! - Tokens are size-checked before parsing
//! - The verification algorithm comes from the published key, not from
//!   the token header
//! - Expiry, not-before, and issued-at are validated with bounded skew
//! - Client-facing messages stay generic; specifics go to logs

use crate::auth::claims::Claims;
use crate::auth::decision::{Decision, DenyReason};
use crate::auth::jwks::{JwksClient, VerifyKey};
use crate::auth::token::{self, validate_iat};
use crate::errors::AuthError;
use crate::observability;
use jsonwebtoken::{decode, errors::ErrorKind, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Stateless per-request verifier, constructed once at startup.
pub struct TokenVerifier {
    /// Source of verification keys.
    jwks_client: Arc<JwksClient>,

    /// The audience identifier this service answers to.
    expected_audience: String,

    /// Issuer to enforce, when known.
    issuer: Option<String>,

    /// Leeway for temporal claims.
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// `expected_audience` is this service's own identifier; `issuer`,
    /// when present, is enforced against the token's `iss` claim.
    pub fn new(
        jwks_client: Arc<JwksClient>,
        expected_audience: String,
        issuer: Option<String>,
        clock_skew: Duration,
    ) -> Self {
        Self {
            jwks_client,
            expected_audience,
            issuer,
            clock_skew,
        }
    }

    /// The audience identifier this verifier enforces.
    #[must_use]
    pub fn expected_audience(&self) -> &str {
        &self.expected_audience
    }

    /// Verify a bearer token and return the decision.
    ///
    /// Every token-dependent outcome is a [`Decision`]; the only error is
    /// trust-material unavailability, which says nothing about the token.
    ///
    /// # Errors
    ///
    /// `AuthError::ProviderUnavailable` when the key set cannot be fetched.
    pub async fn verify(&self, token: &str) -> Result<Decision, AuthError> {
        match self.authorize(token).await {
            Ok(_) => Ok(Decision::Authorized),
            Err(AuthError::Denied(reason)) => Ok(Decision::Denied(reason)),
            Err(e) => Err(e),
        }
    }

    /// Verify a bearer token and return its claims.
    ///
    /// Same checks as [`verify`](Self::verify), for callers (the
    /// middleware) that need the claims afterwards.
    ///
    /// # Errors
    ///
    /// `AuthError::Denied` with the specific [`DenyReason`], or
    /// `AuthError::ProviderUnavailable`.
    #[instrument(skip_all)]
    pub async fn authorize(&self, token: &str) -> Result<Claims, AuthError> {
        let result = self.authorize_inner(token).await;
        observability::record_decision(observability::outcome_label(&result));
        result
    }

    async fn authorize_inner(&self, token: &str) -> Result<Claims, AuthError> {
        // 1. No credential, no crypto
        if token.trim().is_empty() {
            tracing::debug!(target: "authgate.verifier", "No token presented");
            return Err(AuthError::Denied(DenyReason::MissingToken));
        }

        // 2. Structural pre-checks and key selection
        let kid = token::extract_kid(token).map_err(|e| {
            tracing::debug!(target: "authgate.verifier", error = ?e, "Token failed structural checks");
            AuthError::Denied(DenyReason::Malformed)
        })?;

        let key = self.jwks_client.get_key(&kid).await?;

        // 3. Signature, temporal, and issuer validation
        let claims = self.decode_and_validate(token, &key)?;

        if let Some(iat) = claims.iat {
            if let Err(e) = validate_iat(iat, self.clock_skew) {
                tracing::debug!(target: "authgate.verifier", error = ?e, "Token iat validation failed");
                return Err(AuthError::Denied(DenyReason::InvalidSignatureOrExpired));
            }
        }

        // 4. Audience membership on the normalized set
        if !claims.aud.contains(&self.expected_audience) {
            tracing::debug!(
                target: "authgate.verifier",
                expected = %self.expected_audience,
                token_audiences = claims.aud.len(),
                "Token audience does not name this service"
            );
            return Err(AuthError::Denied(DenyReason::AudienceMismatch));
        }

        tracing::debug!(target: "authgate.verifier", "Token authorized");
        Ok(claims)
    }

    fn decode_and_validate(&self, token: &str, key: &VerifyKey) -> Result<Claims, AuthError> {
        // The algorithm is pinned to the key; a token header claiming
        // anything else fails validation outright.
        let mut validation = Validation::new(key.algorithm);
        validation.leeway = self.clock_skew.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Audience is checked separately on the normalized set
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &key.decoding_key, &validation).map_err(|e| {
            let reason = deny_reason_for(&e);
            tracing::debug!(target: "authgate.verifier", error = %e, reason = %reason, "Token verification failed");
            AuthError::Denied(reason)
        })?;

        Ok(token_data.claims)
    }
}

/// Map a decode failure onto the deny taxonomy.
///
/// Structural problems (undecodable, unparseable, claims missing outright)
/// are `Malformed`; everything else - and anything new the library grows -
/// is treated as a verification failure, never an accept.
fn deny_reason_for(error: &jsonwebtoken::errors::Error) -> DenyReason {
    match error.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => DenyReason::Malformed,
        _ => DenyReason::InvalidSignatureOrExpired,
    }
}
