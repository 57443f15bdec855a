//! Startup wiring.
//!
//! [`AuthGate::connect`] turns an [`AuthConfig`] into a ready verifier:
//! one HTTP client, endpoint resolution (explicit override or OIDC
//! discovery, with the optional split-horizon rewrite), issuer selection,
//! and the optional user-info client. Runs once at process start and
//! fails fast - nothing here is recoverable at request time.

use crate::auth::discovery::DiscoveryDocument;
use crate::auth::jwks::JwksClient;
use crate::auth::verifier::TokenVerifier;
use crate::config::AuthConfig;
use crate::errors::SetupError;
use crate::middleware::AuthState;
use crate::userinfo::UserInfoClient;
use std::sync::Arc;
use std::time::Duration;

/// The assembled authorization components for one service.
pub struct AuthGate {
    verifier: Arc<TokenVerifier>,
    userinfo: Option<Arc<UserInfoClient>>,
}

impl AuthGate {
    /// Resolve endpoints and build the verifier.
    ///
    /// Discovery is skipped entirely when both `jwks_url` and
    /// `userinfo_url` are configured explicitly.
    ///
    /// # Errors
    ///
    /// `SetupError::Discovery` when the provider's discovery document is
    /// needed but cannot be fetched or parsed.
    pub async fn connect(config: AuthConfig) -> Result<Self, SetupError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authgate.gate", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        let needs_discovery = config.jwks_url.is_none() || config.userinfo_url.is_none();
        let document = if needs_discovery {
            let document = DiscoveryDocument::fetch(&http_client, &config.issuer_url).await?;
            Some(match &config.wellknown_rewrite_url {
                Some(rewrite) => document.rewritten(rewrite),
                None => document,
            })
        } else {
            None
        };

        let jwks_url = config
            .jwks_url
            .clone()
            .or_else(|| document.as_ref().map(|d| d.jwks_uri.clone()))
            .ok_or_else(|| SetupError::Discovery("no JWKS endpoint resolved".to_string()))?;

        // Tokens carry the advertised issuer, which may differ from the
        // configured (internal) provider URL
        let issuer = document
            .as_ref()
            .map(|d| d.issuer.clone())
            .unwrap_or_else(|| config.issuer_url.clone());

        let jwks_client = Arc::new(JwksClient::new(
            http_client.clone(),
            jwks_url,
            config.refresh_interval,
        ));

        let verifier = Arc::new(TokenVerifier::new(
            jwks_client,
            config.audience.clone(),
            Some(issuer),
            config.clock_skew,
        ));

        let userinfo_endpoint = config
            .userinfo_url
            .clone()
            .or_else(|| document.as_ref().and_then(|d| d.userinfo_endpoint.clone()));

        let userinfo = userinfo_endpoint.map(|endpoint| {
            Arc::new(UserInfoClient::new(
                http_client,
                endpoint,
                config.user_cache_size,
                config.user_cache_timeout,
            ))
        });

        tracing::info!(
            target: "authgate.gate",
            audience = %config.audience,
            has_userinfo = userinfo.is_some(),
            "Authorization gate ready"
        );

        Ok(Self { verifier, userinfo })
    }

    /// The token verifier.
    #[must_use]
    pub fn verifier(&self) -> Arc<TokenVerifier> {
        Arc::clone(&self.verifier)
    }

    /// The user-info client, when the provider exposes an endpoint.
    #[must_use]
    pub fn userinfo(&self) -> Option<Arc<UserInfoClient>> {
        self.userinfo.as_ref().map(Arc::clone)
    }

    /// State for the [`require_auth`](crate::middleware::require_auth)
    /// middleware.
    #[must_use]
    pub fn auth_state(&self) -> Arc<AuthState> {
        Arc::new(AuthState {
            verifier: Arc::clone(&self.verifier),
        })
    }
}
