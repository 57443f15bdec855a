//! User-info retrieval with caching.
//!
//! Fetches the provider's user-info document on behalf of an authorized
//! caller and caches it keyed by the bearer token, so a chatty client
//! does not turn into provider load. Cache entries time out independently
//! and are re-armed on access.

use crate::cache::TimeoutCache;
use crate::errors::AuthError;
use std::time::Duration;
use tracing::instrument;

/// Client for the provider's user-info endpoint.
pub struct UserInfoClient {
    endpoint: String,
    http_client: reqwest::Client,
    cache: TimeoutCache<String, serde_json::Value>,
}

impl UserInfoClient {
    /// Create a client for `endpoint`, caching up to `cache_size`
    /// documents for `cache_timeout` past their last use.
    pub fn new(
        http_client: reqwest::Client,
        endpoint: String,
        cache_size: usize,
        cache_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            http_client,
            cache: TimeoutCache::new(cache_size, cache_timeout),
        }
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the user-info document for the caller presenting `token`.
    ///
    /// The token must already have been verified; this call only relays
    /// it. Served from cache when possible.
    ///
    /// # Errors
    ///
    /// `AuthError::Denied` when the provider itself rejects the token
    /// (401/403 - typically revoked between our check and this call);
    /// `AuthError::ProviderUnavailable` for transport failures and other
    /// endpoint errors.
    #[instrument(skip_all)]
    pub async fn fetch(&self, token: &str) -> Result<serde_json::Value, AuthError> {
        if let Some(document) = self.cache.get(&token.to_string()).await {
            tracing::debug!(target: "authgate.userinfo", "User-info cache hit");
            return Ok(document);
        }

        let response = self
            .http_client
            .get(&self.endpoint)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authgate.userinfo", error = %e, "User-info fetch failed");
                AuthError::ProviderUnavailable(format!("user-info fetch failed: {e}"))
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            tracing::debug!(
                target: "authgate.userinfo",
                status = %response.status(),
                "Provider rejected the token at the user-info endpoint"
            );
            return Err(AuthError::Denied(
                crate::auth::DenyReason::InvalidSignatureOrExpired,
            ));
        }

        if !response.status().is_success() {
            tracing::error!(
                target: "authgate.userinfo",
                status = %response.status(),
                "User-info endpoint returned error"
            );
            return Err(AuthError::ProviderUnavailable(format!(
                "user-info endpoint returned {}",
                response.status()
            )));
        }

        let document: serde_json::Value = response.json().await.map_err(|e| {
            tracing::error!(target: "authgate.userinfo", error = %e, "User-info response is not JSON");
            AuthError::ProviderUnavailable(format!("user-info parse failed: {e}"))
        })?;

        self.cache.insert(token.to_string(), document.clone()).await;
        Ok(document)
    }
}
