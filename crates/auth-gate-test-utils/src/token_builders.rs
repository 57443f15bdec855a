//! Builder for test token claims.
//!
//! Covers the audience shapes real providers emit: a bare string, an
//! array of strings, or no `aud` claim at all.

use chrono::{Duration, Utc};
use serde_json::json;

/// Audience shapes a test token can carry.
enum AudienceShape {
    None,
    Scalar(String),
    Sequence(Vec<String>),
}

/// Fluent builder for test JWT claims.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_subject("alice")
///     .with_audience("org.acme.portal")
///     .expires_in(3600)
///     .build();
/// let token = keypair.sign(&claims);
/// ```
pub struct TestTokenBuilder {
    sub: String,
    aud: AudienceShape,
    iss: Option<String>,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// A builder with a valid one-hour token as the starting point.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            aud: AudienceShape::None,
            iss: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the subject.
    #[must_use]
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set a scalar `aud` claim (bare string on the wire).
    #[must_use]
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = AudienceShape::Scalar(audience.to_string());
        self
    }

    /// Set a sequence `aud` claim (array on the wire).
    #[must_use]
    pub fn with_audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = AudienceShape::Sequence(audiences.iter().map(ToString::to_string).collect());
        self
    }

    /// Set the issuer.
    #[must_use]
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Set expiry relative to now; negative values build expired tokens.
    #[must_use]
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set the issued-at timestamp directly.
    #[must_use]
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims document.
    #[must_use]
    pub fn build(self) -> serde_json::Value {
        let mut claims = json!({
            "sub": self.sub,
            "exp": self.exp,
            "iat": self.iat,
        });

        match self.aud {
            AudienceShape::None => {}
            AudienceShape::Scalar(aud) => {
                claims["aud"] = json!(aud);
            }
            AudienceShape::Sequence(auds) => {
                claims["aud"] = json!(auds);
            }
        }

        if let Some(iss) = self.iss {
            claims["iss"] = json!(iss);
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
