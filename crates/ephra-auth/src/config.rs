//! Authentication configuration.
//!
//! Durations use humantime notation (`"5m"`, `"8h"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! endpoint = "https://tenant.logto.app"
//! api_resource = "https://api.ephra.app"
//!
//! [auth.jwks]
//! default_ttl = "1h"
//!
//! [auth.session]
//! ttl = "8h"
//! ```

use std::time::Duration;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use url::Url;

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the identity provider. Unset means authentication is
    /// unavailable and every protected request is rejected with 503.
    pub endpoint: Option<String>,

    /// Overrides the derived issuer (`{endpoint}/oidc`).
    pub issuer: Option<String>,

    /// Overrides the derived key-set URI (`{endpoint}/oidc/jwks`).
    pub jwks_uri: Option<String>,

    /// API resource identifier that must appear in the token audience.
    pub api_resource: String,

    /// Accepted signing algorithms.
    pub algorithms: Vec<String>,

    /// Clock skew tolerated when checking `exp`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Signing key cache settings.
    pub jwks: JwksCacheConfig,

    /// Admin session settings.
    pub session: SessionConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            issuer: None,
            jwks_uri: None,
            api_resource: String::new(),
            algorithms: vec![
                "RS256".to_string(),
                "ES256".to_string(),
                "ES384".to_string(),
                "ES512".to_string(),
            ],
            leeway: Duration::from_secs(30),
            jwks: JwksCacheConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Configuration for the signing-key cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwksCacheConfig {
    /// TTL when the response carries no `Cache-Control: max-age`.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Upper bound on any TTL.
    #[serde(with = "humantime_serde")]
    pub max_ttl: Duration,

    /// Lower bound on any TTL.
    #[serde(with = "humantime_serde")]
    pub min_ttl: Duration,

    /// HTTP request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum response size in bytes.
    pub max_response_size: usize,

    /// Whether plain-HTTP key-set URIs are accepted. Local testing only.
    pub allow_http: bool,
}

impl Default for JwksCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_ttl: Duration::from_secs(86400),
            min_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024,
            allow_http: false,
        }
    }
}

impl JwksCacheConfig {
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_min_ttl(mut self, ttl: Duration) -> Self {
        self.min_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }
}

/// Server-side session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime after creation.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// How often expired sessions are swept.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(8 * 3600),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

/// Errors raised while validating [`AuthConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// `true` when an identity provider endpoint is set.
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    fn base(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(|e| e.trim().trim_end_matches('/'))
            .filter(|e| !e.is_empty())
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> Option<String> {
        self.issuer
            .clone()
            .or_else(|| self.base().map(|b| format!("{b}/oidc")))
    }

    /// Location of the signing key set.
    pub fn jwks_uri(&self) -> Result<Option<Url>, ConfigError> {
        let raw = match (&self.jwks_uri, self.base()) {
            (Some(uri), _) => uri.clone(),
            (None, Some(base)) => format!("{base}/oidc/jwks"),
            (None, None) => return Ok(None),
        };
        Url::parse(&raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(format!("jwks_uri '{raw}': {e}")))
    }

    /// Parses the configured algorithm names.
    pub fn parsed_algorithms(&self) -> Result<Vec<Algorithm>, ConfigError> {
        self.algorithms
            .iter()
            .map(|name| {
                name.parse::<Algorithm>().map_err(|_| {
                    ConfigError::InvalidValue(format!("Unsupported signing algorithm: '{name}'"))
                })
            })
            .collect()
    }

    /// Validates the configuration.
    ///
    /// An unconfigured endpoint is valid; the validator reports it per
    /// request instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::InvalidValue(
                "algorithms cannot be empty".to_string(),
            ));
        }
        self.parsed_algorithms()?;

        if self.jwks.min_ttl > self.jwks.max_ttl {
            return Err(ConfigError::InvalidValue(
                "jwks.min_ttl must not exceed jwks.max_ttl".to_string(),
            ));
        }

        if self.session.ttl.is_zero() || self.session.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session.ttl and session.sweep_interval must be > 0".to_string(),
            ));
        }

        if self.is_configured() {
            if self.api_resource.trim().is_empty() {
                return Err(ConfigError::Missing("auth.api_resource".to_string()));
            }
            if let Some(uri) = self.jwks_uri()?
                && uri.scheme() != "https"
                && !self.jwks.allow_http
            {
                return Err(ConfigError::InvalidValue(
                    "jwks_uri must use https".to_string(),
                ));
            }
        }

        Ok(())
    }
}
