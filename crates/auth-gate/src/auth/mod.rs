//! Token verification.
//!
//! # Components
//!
//! - `claims` - verified claims and the normalized audience set
//! - `decision` - authorization outcome types
//! - `discovery` - OIDC discovery document resolution
//! - `jwks` - key fetching and caching
//! - `token` - pre-verification structural checks
//! - `verifier` - the audience-scoped verifier itself

pub mod claims;
pub mod decision;
pub mod discovery;
pub mod jwks;
pub mod token;
pub mod verifier;

pub use claims::{Audience, Claims};
pub use decision::{Decision, DenyReason};
pub use discovery::DiscoveryDocument;
pub use jwks::JwksClient;
pub use verifier::TokenVerifier;
