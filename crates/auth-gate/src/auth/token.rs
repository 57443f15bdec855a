//! Pre-verification token handling.
//!
//! Everything in this module runs BEFORE any cryptographic work: the size
//! guard, the header parse that recovers the `kid`, and the issued-at skew
//! check applied after signature verification. None of it validates a
//! signature; the caller must still verify the token against a trusted key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

/// Maximum accepted token size in bytes (8 KiB).
///
/// Oversized tokens are rejected before base64 decoding or signature
/// verification to bound the work an unauthenticated caller can cause.
/// Typical access tokens are well under 1 KiB.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Default leeway for temporal claims (60 seconds).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Upper bound on configurable leeway (10 minutes). Larger values weaken
/// expiry enforcement enough to be a misconfiguration.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Failures while reading a token without verifying it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenParseError {
    /// Token exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("token exceeds size limit")]
    TokenTooLarge,

    /// Token is not structurally a JWT (wrong part count, bad base64,
    /// header not JSON).
    #[error("token is not structurally valid")]
    NotAToken,

    /// Token header carries no usable `kid`.
    #[error("token header has no key id")]
    MissingKid,

    /// Token `iat` is further in the future than the allowed skew.
    #[error("token issued-at is in the future")]
    IssuedInFuture,
}

/// Extract the `kid` from a token header without verifying the signature.
///
/// The returned value must only be used to look up a key in a trusted JWK
/// set; the token itself is still unverified.
///
/// # Errors
///
/// [`TokenParseError::TokenTooLarge`] over the size limit,
/// [`TokenParseError::NotAToken`] for structural failures,
/// [`TokenParseError::MissingKid`] when the header has no non-empty string
/// `kid`.
pub fn extract_kid(token: &str) -> Result<String, TokenParseError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "authgate.token",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenParseError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "authgate.token",
            parts = parts.len(),
            "Token rejected: not header.payload.signature"
        );
        return Err(TokenParseError::NotAToken);
    }

    let header_part = parts.first().ok_or(TokenParseError::NotAToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "authgate.token", error = %e, "Token header is not base64url");
        TokenParseError::NotAToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "authgate.token", error = %e, "Token header is not JSON");
        TokenParseError::NotAToken
    })?;

    // Empty-string kids are rejected along with missing ones
    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(TokenParseError::MissingKid)
}

/// Validate the `iat` claim against the allowed clock skew.
///
/// An issued-at timestamp beyond `now + skew` indicates clock drift at
/// best and token manipulation at worst; either way the token is rejected.
///
/// # Errors
///
/// [`TokenParseError::IssuedInFuture`] when `iat` exceeds the tolerance.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), TokenParseError> {
    validate_iat_at(iat, clock_skew, chrono::Utc::now().timestamp())
}

/// Deterministic variant of [`validate_iat`] for boundary tests.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), TokenParseError> {
    // Safe cast: skew is bounded to MAX_CLOCK_SKEW, well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let skew_secs = clock_skew.as_secs() as i64;

    if iat > now + skew_secs {
        tracing::debug!(
            target: "authgate.token",
            iat = iat,
            now = now,
            skew_secs = skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(TokenParseError::IssuedInFuture);
    }

    Ok(())
}
