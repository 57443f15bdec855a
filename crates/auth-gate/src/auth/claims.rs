//! Verified token claims.
//!
//! The `aud` claim is normalized into [`Audience`] at the deserialization
//! boundary: providers encode a single audience as a bare string and
//! multiple audiences as an array, and nothing downstream should ever
//! branch on that shape. The `sub` field is redacted in Debug output to
//! keep caller identifiers out of logs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// The set of services a token is intended for.
///
/// Deserializes from either a bare string or an array of strings; always
/// serializes as an array. A missing `aud` claim is the empty set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AudienceRepr")]
pub struct Audience(BTreeSet<String>);

/// Wire shapes the `aud` claim may arrive in.
#[derive(Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    One(String),
    Many(Vec<String>),
}

impl From<AudienceRepr> for Audience {
    fn from(repr: AudienceRepr) -> Self {
        match repr {
            AudienceRepr::One(value) => Audience(BTreeSet::from([value])),
            AudienceRepr::Many(values) => Audience(values.into_iter().collect()),
        }
    }
}

impl Audience {
    /// Membership test for one audience identifier.
    #[must_use]
    pub fn contains(&self, audience: &str) -> bool {
        self.0.contains(audience)
    }

    /// `true` when the token names no audience at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct audiences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the audience identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Debug for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience(BTreeSet::from([value.to_string()]))
    }
}

impl FromIterator<String> for Audience {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Audience(iter.into_iter().collect())
    }
}

/// Claims extracted from a verified token.
///
/// Standard claims get named fields; anything else the provider includes
/// (roles, entitlements, profile data) lands in `extra` untouched.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user or client identifier) - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Intended audiences, normalized to a set.
    #[serde(default, skip_serializing_if = "Audience::is_empty")]
    pub aud: Audience,

    /// Remaining provider-specific claims.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_from_scalar() {
        let aud: Audience = serde_json::from_str(r#""org.acme.registry.id-mapper""#).unwrap();
        assert!(aud.contains("org.acme.registry.id-mapper"));
        assert_eq!(aud.len(), 1);
    }

    #[test]
    fn test_audience_from_sequence() {
        let aud: Audience =
            serde_json::from_str(r#"["org.acme.registry.id-mapper", "org.acme.portal"]"#).unwrap();
        assert!(aud.contains("org.acme.registry.id-mapper"));
        assert!(aud.contains("org.acme.portal"));
        assert_eq!(aud.len(), 2);
    }

    #[test]
    fn test_scalar_and_singleton_sequence_are_equivalent() {
        let scalar: Audience = serde_json::from_str(r#""svc""#).unwrap();
        let sequence: Audience = serde_json::from_str(r#"["svc"]"#).unwrap();
        assert_eq!(scalar, sequence);
    }

    #[test]
    fn test_audience_deduplicates() {
        let aud: Audience = serde_json::from_str(r#"["svc", "svc"]"#).unwrap();
        assert_eq!(aud.len(), 1);
    }

    #[test]
    fn test_audience_serializes_as_sequence() {
        let aud = Audience::from("svc");
        assert_eq!(serde_json::to_string(&aud).unwrap(), r#"["svc"]"#);
    }

    #[test]
    fn test_audience_rejects_non_string_shapes() {
        assert!(serde_json::from_str::<Audience>("42").is_err());
        assert!(serde_json::from_str::<Audience>(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_claims_missing_aud_is_empty_set() {
        let claims: Claims =
            serde_json::from_str(r#"{"sub":"user","exp":1234567890}"#).unwrap();
        assert!(claims.aud.is_empty());
        assert!(!claims.aud.contains("anything"));
    }

    #[test]
    fn test_claims_capture_extra_fields() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"user","exp":1234567890,"aud":"svc","scope":"read write","tenant":"t1"}"#,
        )
        .unwrap();
        assert_eq!(claims.extra["scope"], "read write");
        assert_eq!(claims.extra["tenant"], "t1");
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"secret-user-id","exp":1234567890,"aud":["svc"]}"#,
        )
        .unwrap();

        let debug_str = format!("{claims:?}");
        assert!(
            !debug_str.contains("secret-user-id"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_claims_roundtrip() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"user","exp":1234567890,"iat":1234560000,"iss":"https://idp.example.org","aud":["a","b"]}"#,
        )
        .unwrap();

        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();

        assert_eq!(back.sub, claims.sub);
        assert_eq!(back.exp, claims.exp);
        assert_eq!(back.iat, claims.iat);
        assert_eq!(back.iss, claims.iss);
        assert_eq!(back.aud, claims.aud);
    }
}
