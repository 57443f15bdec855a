//! Authorization decision types.
//!
//! Verification never signals its outcome through panics or bare errors:
//! every token-dependent failure ends in a [`DenyReason`], so callers can
//! match on the outcome without catching anything.

use std::fmt;

/// Why a bearer token was rejected.
///
/// The variants are terminal, locally determined outcomes. None of them is
/// retryable without a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No credential was presented (absent header, wrong scheme, or an
    /// empty token string).
    MissingToken,

    /// The credential is present but is not structurally a verifiable
    /// token: oversized, not three dot-separated parts, undecodable
    /// header, missing `kid`, or missing required claims.
    Malformed,

    /// The credential parses but fails cryptographic or temporal
    /// validation: bad signature, unknown key, expired, not yet valid,
    /// issued in the future, or wrong issuer.
    InvalidSignatureOrExpired,

    /// The credential is valid but its `aud` claim does not name this
    /// service.
    AudienceMismatch,
}

impl DenyReason {
    /// Stable label used for logging and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MissingToken => "missing_token",
            DenyReason::Malformed => "malformed",
            DenyReason::InvalidSignatureOrExpired => "invalid_signature_or_expired",
            DenyReason::AudienceMismatch => "audience_mismatch",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying one bearer token against the configured audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The token is valid and names this service. Carries no further data;
    /// use [`crate::auth::TokenVerifier::authorize`] when the claims are
    /// needed.
    Authorized,

    /// The token was rejected for the given reason.
    Denied(DenyReason),
}

impl Decision {
    /// `true` when the request may proceed.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Decision::Authorized)
    }

    /// The deny reason, when the decision is a denial.
    #[must_use]
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Authorized => None,
            Decision::Denied(reason) => Some(*reason),
        }
    }
}
