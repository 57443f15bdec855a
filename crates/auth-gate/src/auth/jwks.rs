//! JWKS client: fetches and caches the identity provider's signing keys.
//!
//! Keys are cached for the configured refresh interval so key rotation at
//! the provider is picked up without hammering the endpoint on every
//! request. Lookups never trigger a refetch while the cache is still
//! valid, even when the requested `kid` is absent - an attacker-supplied
//! `kid` must not be able to drive request volume against the provider.

use crate::auth::DenyReason;
use crate::errors::AuthError;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::instrument;

/// Default refresh interval in seconds (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 300;

/// One verification key derived from a JWK.
///
/// The algorithm is fixed by the key material itself, never by the token
/// header, which closes the usual algorithm-confusion hole.
#[derive(Clone)]
pub struct VerifyKey {
    /// Key ID this key was published under.
    pub kid: String,

    /// Decoding key for signature verification.
    pub decoding_key: DecodingKey,

    /// Signature algorithm the key verifies.
    pub algorithm: Algorithm,
}

/// Cached key map with expiry time.
struct CachedKeys {
    keys: HashMap<String, VerifyKey>,
    expires_at: Instant,
}

/// Thread-safe JWKS client with TTL caching.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedKeys>>>,
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a client for the given JWKS endpoint.
    ///
    /// `cache_ttl` is how long a fetched key set is reused before the
    /// endpoint is consulted again.
    pub fn new(http_client: reqwest::Client, jwks_url: String, cache_ttl: Duration) -> Self {
        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    /// Look up a verification key by key ID.
    ///
    /// Serves from the cache while valid; fetches from the provider on a
    /// cold or expired cache.
    ///
    /// # Errors
    ///
    /// `AuthError::ProviderUnavailable` when the endpoint cannot be reached or
    /// returns garbage; `AuthError::Denied(InvalidSignatureOrExpired)`
    /// when the key set simply has no such `kid`.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<VerifyKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "authgate.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    tracing::debug!(target: "authgate.jwks", kid = %kid, "Key not found in valid JWKS cache");
                    return Err(AuthError::Denied(DenyReason::InvalidSignatureOrExpired));
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        if let Some(cached) = cache.as_ref() {
            if let Some(key) = cached.keys.get(kid) {
                return Ok(key.clone());
            }
        }

        tracing::warn!(target: "authgate.jwks", kid = %kid, "Key not found in JWKS after refresh");
        Err(AuthError::Denied(DenyReason::InvalidSignatureOrExpired))
    }

    /// Refresh the cached key set from the provider.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), AuthError> {
        tracing::debug!(target: "authgate.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authgate.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::ProviderUnavailable(format!("JWKS fetch failed: {e}"))
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "authgate.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::ProviderUnavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwk_set: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(target: "authgate.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::ProviderUnavailable(format!("JWKS parse failed: {e}"))
        })?;

        let mut keys = HashMap::new();
        for jwk in &jwk_set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::warn!(target: "authgate.jwks", "Skipping JWK without kid");
                continue;
            };

            let algorithm = match algorithm_for_jwk(jwk) {
                Ok(algorithm) => algorithm,
                Err(reason) => {
                    tracing::warn!(target: "authgate.jwks", kid = %kid, reason = %reason, "Skipping unusable JWK");
                    continue;
                }
            };

            match DecodingKey::from_jwk(jwk) {
                Ok(decoding_key) => {
                    keys.insert(
                        kid.clone(),
                        VerifyKey {
                            kid,
                            decoding_key,
                            algorithm,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(target: "authgate.jwks", kid = %kid, error = %e, "Failed to build decoding key");
                }
            }
        }

        tracing::info!(
            target: "authgate.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(())
    }

    /// Drop the cache and refetch immediately.
    ///
    /// For tests and manual invalidation after a known rotation.
    pub async fn force_refresh(&self) -> Result<(), AuthError> {
        self.refresh_cache().await
    }
}

/// Signature algorithm implied by a JWK's key material.
fn algorithm_for_jwk(jwk: &Jwk) -> Result<Algorithm, String> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match &params.curve {
            EllipticCurve::P256 => Ok(Algorithm::ES256),
            EllipticCurve::P384 => Ok(Algorithm::ES384),
            other => Err(format!("unsupported elliptic curve {other:?}")),
        },
        AlgorithmParameters::OctetKeyPair(_) => Ok(Algorithm::EdDSA),
        AlgorithmParameters::OctetKey(_) => {
            Err("symmetric keys are not accepted for token verification".to_string())
        }
    }
}
