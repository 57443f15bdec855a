//! OIDC discovery.
//!
//! Resolves the provider's JWKS and user-info endpoints from
//! `<issuer>/.well-known/openid-configuration`. Runs once at startup;
//! a provider that cannot be discovered is a fatal configuration problem,
//! not a per-request condition.

use crate::errors::SetupError;
use serde::{Deserialize, Serialize};

/// The subset of the OIDC discovery document this library consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// Issuer identifier, exactly as tokens will carry it in `iss`.
    pub issuer: String,

    /// JWKS endpoint.
    pub jwks_uri: String,

    /// User-info endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// Authorization endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    /// Token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// End-session endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
}

impl DiscoveryDocument {
    /// Fetch the discovery document for `issuer_url`.
    ///
    /// # Errors
    ///
    /// `SetupError::Discovery` when the document cannot be fetched or
    /// parsed.
    pub async fn fetch(
        http_client: &reqwest::Client,
        issuer_url: &str,
    ) -> Result<Self, SetupError> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            issuer_url.trim_end_matches('/')
        );
        tracing::debug!(target: "authgate.discovery", url = %discovery_url, "Fetching OIDC discovery document");

        let response = http_client
            .get(&discovery_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SetupError::Discovery(format!("fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SetupError::Discovery(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let document: DiscoveryDocument = response
            .json()
            .await
            .map_err(|e| SetupError::Discovery(format!("parse failed: {e}")))?;

        tracing::info!(
            target: "authgate.discovery",
            issuer = %document.issuer,
            jwks_uri = %document.jwks_uri,
            has_userinfo = document.userinfo_endpoint.is_some(),
            "Discovery document resolved"
        );

        Ok(document)
    }

    /// Re-base endpoint URLs onto `rewrite_base`.
    ///
    /// Split-horizon deployments reach the provider through an internal
    /// address while the document advertises the public origin. Endpoints
    /// that start with the document's own issuer are rewritten; anything
    /// else is left alone. The `issuer` field keeps its advertised value
    /// because tokens carry that value in `iss`.
    #[must_use]
    pub fn rewritten(mut self, rewrite_base: &str) -> Self {
        let from = self.issuer.trim_end_matches('/').to_string();
        let to = rewrite_base.trim_end_matches('/');

        let rebase = |url: String| -> String {
            match url.strip_prefix(&from) {
                Some(rest) => format!("{to}{rest}"),
                None => url,
            }
        };

        self.jwks_uri = rebase(self.jwks_uri);
        self.userinfo_endpoint = self.userinfo_endpoint.map(&rebase);
        self.authorization_endpoint = self.authorization_endpoint.map(&rebase);
        self.token_endpoint = self.token_endpoint.map(&rebase);
        self.end_session_endpoint = self.end_session_endpoint.map(&rebase);
        self
    }
}
