//! Library configuration.
//!
//! Everything is read once at startup into an explicit [`AuthConfig`]
//! value that gets injected into the gate - there is no ambient global
//! state, and a bad configuration stops the process before it serves a
//! single request.

use crate::auth::jwks::DEFAULT_REFRESH_INTERVAL_SECONDS;
use crate::auth::token::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default user-info cache capacity.
pub const DEFAULT_USER_CACHE_SIZE: usize = 999;

/// Default user-info cache entry timeout in seconds (30 minutes).
pub const DEFAULT_USER_CACHE_TIMEOUT_SECONDS: u64 = 1800;

/// Configuration for one protected service.
///
/// Loaded from `AUTH_*` environment variables with sensible defaults for
/// everything except the audience and the identity provider.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The audience identifier this service answers to,
    /// e.g. `"org.acme.registry.id-mapper"`.
    pub audience: String,

    /// Identity provider base URL (trailing slashes stripped).
    pub issuer_url: String,

    /// Explicit JWKS endpoint; when unset it is resolved via discovery.
    pub jwks_url: Option<String>,

    /// How long fetched signing keys are reused.
    pub refresh_interval: Duration,

    /// Leeway for temporal claims.
    pub clock_skew: Duration,

    /// Re-base discovered endpoint URLs onto this origin
    /// (split-horizon deployments).
    pub wellknown_rewrite_url: Option<String>,

    /// Explicit user-info endpoint; when unset it comes from discovery,
    /// and user-info support is disabled if discovery has none either.
    pub userinfo_url: Option<String>,

    /// User-info cache capacity.
    pub user_cache_size: usize,

    /// User-info cache entry timeout.
    pub user_cache_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("{var} must not be empty")]
    EmptyVar { var: &'static str },

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

impl AuthConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first offending variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map (for testing).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first offending variable.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let audience = vars
            .get("AUTH_AUDIENCE")
            .ok_or(ConfigError::MissingVar("AUTH_AUDIENCE"))?
            .clone();
        if audience.trim().is_empty() {
            return Err(ConfigError::EmptyVar {
                var: "AUTH_AUDIENCE",
            });
        }

        let issuer_url = vars
            .get("AUTH_ISSUER_URL")
            .ok_or(ConfigError::MissingVar("AUTH_ISSUER_URL"))?
            .trim_end_matches('/')
            .to_string();
        if issuer_url.is_empty() {
            return Err(ConfigError::EmptyVar {
                var: "AUTH_ISSUER_URL",
            });
        }

        let refresh_interval = Duration::from_secs(positive_int(
            vars,
            "AUTH_REFRESH_INTERVAL_SECONDS",
            DEFAULT_REFRESH_INTERVAL_SECONDS,
        )?);

        let clock_skew_secs = positive_int(
            vars,
            "AUTH_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
        )?;
        if clock_skew_secs > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidValue {
                var: "AUTH_CLOCK_SKEW_SECONDS",
                reason: format!(
                    "must not exceed {} seconds, got {clock_skew_secs}",
                    MAX_CLOCK_SKEW.as_secs()
                ),
            });
        }

        let user_cache_size = positive_int(
            vars,
            "AUTH_USER_CACHE_SIZE",
            DEFAULT_USER_CACHE_SIZE as u64,
        )?;
        // Safe cast: bounded parse result, far below usize::MAX on any target
        #[allow(clippy::cast_possible_truncation)]
        let user_cache_size = user_cache_size as usize;

        let user_cache_timeout = Duration::from_secs(positive_int(
            vars,
            "AUTH_USER_CACHE_TIMEOUT_SECONDS",
            DEFAULT_USER_CACHE_TIMEOUT_SECONDS,
        )?);

        Ok(AuthConfig {
            audience,
            issuer_url,
            jwks_url: vars.get("AUTH_JWKS_URL").cloned(),
            refresh_interval,
            clock_skew: Duration::from_secs(clock_skew_secs),
            wellknown_rewrite_url: vars.get("AUTH_WELLKNOWN_REWRITE_URL").cloned(),
            userinfo_url: vars.get("AUTH_USERINFO_URL").cloned(),
            user_cache_size,
            user_cache_timeout,
        })
    }
}

/// Parse an optional positive integer variable, falling back to `default`.
fn positive_int(
    vars: &HashMap<String, String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(var) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| ConfigError::InvalidValue {
        var,
        reason: format!("must be a valid positive integer, got '{value_str}': {e}"),
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "AUTH_AUDIENCE".to_string(),
                "org.acme.registry.id-mapper".to_string(),
            ),
            (
                "AUTH_ISSUER_URL".to_string(),
                "https://login.example.org".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_with_defaults() {
        let config = AuthConfig::from_vars(&base_vars()).expect("config should load");

        assert_eq!(config.audience, "org.acme.registry.id-mapper");
        assert_eq!(config.issuer_url, "https://login.example.org");
        assert!(config.jwks_url.is_none());
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.clock_skew, DEFAULT_CLOCK_SKEW);
        assert!(config.wellknown_rewrite_url.is_none());
        assert!(config.userinfo_url.is_none());
        assert_eq!(config.user_cache_size, 999);
        assert_eq!(config.user_cache_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_from_vars_with_custom_values() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH_JWKS_URL".to_string(),
            "https://login.example.org/certs".to_string(),
        );
        vars.insert("AUTH_REFRESH_INTERVAL_SECONDS".to_string(), "60".to_string());
        vars.insert("AUTH_CLOCK_SKEW_SECONDS".to_string(), "120".to_string());
        vars.insert(
            "AUTH_WELLKNOWN_REWRITE_URL".to_string(),
            "http://keycloak.internal:8080".to_string(),
        );
        vars.insert("AUTH_USER_CACHE_SIZE".to_string(), "10".to_string());
        vars.insert(
            "AUTH_USER_CACHE_TIMEOUT_SECONDS".to_string(),
            "300".to_string(),
        );

        let config = AuthConfig::from_vars(&vars).expect("config should load");

        assert_eq!(
            config.jwks_url.as_deref(),
            Some("https://login.example.org/certs")
        );
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.clock_skew, Duration::from_secs(120));
        assert_eq!(
            config.wellknown_rewrite_url.as_deref(),
            Some("http://keycloak.internal:8080")
        );
        assert_eq!(config.user_cache_size, 10);
        assert_eq!(config.user_cache_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_missing_audience() {
        let mut vars = base_vars();
        vars.remove("AUTH_AUDIENCE");

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingVar("AUTH_AUDIENCE"))));
    }

    #[test]
    fn test_empty_audience() {
        let mut vars = base_vars();
        vars.insert("AUTH_AUDIENCE".to_string(), "   ".to_string());

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::EmptyVar {
                var: "AUTH_AUDIENCE"
            })
        ));
    }

    #[test]
    fn test_missing_issuer() {
        let mut vars = base_vars();
        vars.remove("AUTH_ISSUER_URL");

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::MissingVar("AUTH_ISSUER_URL"))
        ));
    }

    #[test]
    fn test_issuer_trailing_slash_is_stripped() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH_ISSUER_URL".to_string(),
            "https://login.example.org/".to_string(),
        );

        let config = AuthConfig::from_vars(&vars).expect("config should load");
        assert_eq!(config.issuer_url, "https://login.example.org");
    }

    #[test]
    fn test_refresh_interval_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("AUTH_REFRESH_INTERVAL_SECONDS".to_string(), "0".to_string());

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, .. }) if var == "AUTH_REFRESH_INTERVAL_SECONDS"
        ));
    }

    #[test]
    fn test_refresh_interval_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH_REFRESH_INTERVAL_SECONDS".to_string(),
            "five-minutes".to_string(),
        );

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_clock_skew_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("AUTH_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, reason })
                if var == "AUTH_CLOCK_SKEW_SECONDS" && reason.contains("must not exceed 600")
        ));
    }

    #[test]
    fn test_clock_skew_accepts_max() {
        let mut vars = base_vars();
        vars.insert("AUTH_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());

        let config = AuthConfig::from_vars(&vars).expect("config should load");
        assert_eq!(config.clock_skew, Duration::from_secs(600));
    }

    #[test]
    fn test_user_cache_size_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("AUTH_USER_CACHE_SIZE".to_string(), "0".to_string());

        let result = AuthConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, .. }) if var == "AUTH_USER_CACHE_SIZE"
        ));
    }
}
