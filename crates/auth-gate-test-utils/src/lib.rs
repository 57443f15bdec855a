//! # Auth Gate Test Utilities
//!
//! Shared fixtures for auth-gate tests:
//! - Deterministic Ed25519 keypairs that sign tokens and publish JWKs
//! - Claim builders covering the audience shapes providers emit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_gate_test_utils::{TestKeypair, TestTokenBuilder};
//!
//! let keypair = TestKeypair::new(1, "test-key-01");
//! let token = keypair.sign(
//!     &TestTokenBuilder::new()
//!         .for_subject("alice")
//!         .with_audience("org.acme.portal")
//!         .build(),
//! );
//! ```

pub mod crypto_fixtures;
pub mod token_builders;

pub use crypto_fixtures::TestKeypair;
pub use token_builders::TestTokenBuilder;
