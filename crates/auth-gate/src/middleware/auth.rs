//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token from the Authorization header, runs it
//! through the verifier, and injects the claims into request extensions.
//! The framework-facing half of the contract: `Authorized` lets the
//! request proceed, every denial becomes a 401/403 response.

use crate::auth::{Claims, TokenVerifier};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Verifier shared across all requests.
    pub verifier: Arc<TokenVerifier>,
}

/// Middleware that requires a valid, audience-matching bearer token.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// An absent header, a non-Bearer scheme, and an empty token are all
/// treated as "no credential presented" - the verifier sees an empty
/// token and denies with `MissingToken`, with no crypto work done.
///
/// # Response
///
/// - 401 Unauthorized (with `WWW-Authenticate`) for missing or invalid
///   tokens
/// - 403 Forbidden when the token does not name this service
/// - 503 Service Unavailable when trust material cannot be fetched
/// - Otherwise continues to the next handler with [`Claims`] in the
///   request extensions
#[instrument(skip(state, req, next), name = "authgate.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or_default();

    let claims = state.verifier.authorize(token).await?;

    // Make the verified claims available to downstream handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for reading the authenticated claims off a request.
pub trait ClaimsExt {
    /// The verified claims, when the auth middleware ran for this request.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::http::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}
