//! Audience-scoped bearer-token verification for axum services.
//!
//! A service configures the audience identifier it answers to (for
//! example `"org.acme.registry.id-mapper"`) and the identity provider it
//! trusts; this crate verifies each incoming bearer token - signature,
//! temporal claims, optional issuer - and authorizes the request only
//! when the token's `aud` claim names the service. The `aud` claim is
//! normalized to a set at the boundary, so a provider that encodes a
//! single audience as a bare string and one that encodes a list behave
//! identically.
//!
//! # Architecture
//!
//! ```text
//! config  ->  gate (startup wiring: discovery, JWKS, user info)
//!                |
//!                v
//! middleware -> auth::verifier -> auth::jwks -> provider
//! ```
//!
//! Verification outcomes are values ([`Decision`] /
//! [`errors::AuthError`]), never panics: a malformed token, an expired
//! signature, and a wrong audience each map to a specific deny reason,
//! and only trust-material unavailability is an error distinct from a
//! denial.
//!
//! # Modules
//!
//! - `config` - configuration from environment
//! - `auth` - claims, decisions, discovery, JWKS, verifier
//! - `middleware` - axum middleware and claims accessor
//! - `gate` - startup wiring
//! - `userinfo` - cached user-info retrieval
//! - `cache` - bounded cache with per-entry timeout
//! - `errors` - error types with HTTP status mapping

pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gate;
pub mod middleware;
mod observability;
pub mod userinfo;

pub use auth::{Audience, Claims, Decision, DenyReason, TokenVerifier};
pub use config::AuthConfig;
pub use errors::{AuthError, SetupError};
pub use gate::AuthGate;
pub use middleware::{require_auth, AuthState, ClaimsExt};
pub use userinfo::UserInfoClient;
