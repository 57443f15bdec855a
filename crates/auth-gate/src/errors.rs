//! Error types with HTTP status mapping.
//!
//! Messages returned to clients are intentionally generic: which check
//! rejected a token is logged server-side, never disclosed to the caller.

use crate::auth::DenyReason;
use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Request-time authorization error.
///
/// Maps to HTTP status codes:
/// - `Denied(AudienceMismatch)`: 403 Forbidden
/// - `Denied(_)` otherwise: 401 Unauthorized
/// - `ProviderUnavailable`: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token was rejected; carries the specific reason for logging
    /// and metrics.
    #[error("authorization denied: {0}")]
    Denied(DenyReason),

    /// Trust material could not be retrieved from the identity provider.
    /// This says nothing about the token, so it is not a denial.
    #[error("trust material unavailable: {0}")]
    ProviderUnavailable(String),
}

impl AuthError {
    /// HTTP status code for this error (also used for metrics labels).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Denied(DenyReason::AudienceMismatch) => 403,
            AuthError::Denied(_) => 401,
            AuthError::ProviderUnavailable(_) => 503,
        }
    }
}

impl From<DenyReason> for AuthError {
    fn from(reason: DenyReason) -> Self {
        AuthError::Denied(reason)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::Denied(DenyReason::AudienceMismatch) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "The access token is not valid for this service".to_string(),
            ),
            AuthError::Denied(reason) => {
                tracing::debug!(target: "authgate.errors", reason = %reason, "Request denied");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "The access token is invalid or expired".to_string(),
                )
            }
            AuthError::ProviderUnavailable(reason) => {
                // Log actual reason server-side, return generic message
                tracing::warn!(target: "authgate.errors", reason = %reason, "Trust material unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"auth-gate\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Startup wiring failure. Fatal by design: a service that cannot resolve
/// its trust material must not begin serving requests.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("OIDC discovery failed: {0}")]
    Discovery(String),
}
