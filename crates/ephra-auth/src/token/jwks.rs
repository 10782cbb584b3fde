//! Signing-key resolution backed by the identity provider's JWKS endpoint.
//!
//! The key set is fetched over HTTPS and cached process-wide. The cache
//! TTL follows `Cache-Control: max-age` from the provider, clamped to the
//! configured bounds. An unknown `kid` forces a refetch so rotated keys
//! are picked up without waiting for expiry.
//!
//! A refetch only blocks the validating call that needed it; other
//! requests keep reading the cached set until the write lock is taken to
//! swap in the new one.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Header};
use tokio::sync::RwLock;
use url::Url;

use super::{KeyResolver, ResolvedKey};
use crate::config::JwksCacheConfig;
use crate::error::AuthError;

/// Errors that can occur while fetching or reading a JWKS.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the JWKS.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The JWKS response could not be parsed.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// The requested key was not found in the JWKS.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// No signing keys were found in the JWKS.
    #[error("No signing keys found in JWKS")]
    NoSigningKeys,

    /// The JWKS URI scheme is not allowed.
    #[error("Invalid URL scheme: only HTTPS is allowed")]
    InvalidScheme,

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge { max_size: usize },
}

struct CachedJwks {
    jwks: JwkSet,
    expires_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// [`KeyResolver`] that reads keys from a remote JWKS endpoint.
pub struct JwksKeyResolver {
    jwks_uri: Url,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    config: JwksCacheConfig,
}

impl JwksKeyResolver {
    /// Creates a resolver for `jwks_uri`.
    ///
    /// # Errors
    ///
    /// Fails if the URI scheme is not allowed or the HTTP client cannot
    /// be built.
    pub fn new(jwks_uri: Url, config: JwksCacheConfig) -> Result<Self, JwksError> {
        validate_scheme(&jwks_uri, config.allow_http)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;

        Ok(Self {
            jwks_uri,
            http_client,
            cache: RwLock::new(None),
            config,
        })
    }

    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Looks up a key by `kid`, refetching once if it is not cached.
    pub async fn get_key(&self, kid: &str) -> Result<(DecodingKey, Option<Algorithm>), JwksError> {
        if let Some(found) = self.cached_key(kid).await {
            tracing::trace!(kid, "JWKS cache hit");
            return Ok(found);
        }

        tracing::debug!(kid, uri = %self.jwks_uri, "JWKS cache miss");
        self.refresh().await?;

        self.cached_key(kid)
            .await
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    async fn cached_key(&self, kid: &str) -> Option<(DecodingKey, Option<Algorithm>)> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref().filter(|c| c.is_fresh())?;
        cached
            .jwks
            .keys
            .iter()
            .filter(|k| is_signing_key(k))
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .and_then(|jwk| {
                DecodingKey::from_jwk(jwk)
                    .ok()
                    .map(|dk| (dk, jwk_algorithm(jwk)))
            })
    }

    /// All signing keys, for tokens that carry no `kid`.
    pub async fn signing_keys(&self) -> Result<Vec<(DecodingKey, Option<Algorithm>)>, JwksError> {
        let fresh = self.cache.read().await.as_ref().is_some_and(|c| c.is_fresh());
        if !fresh {
            self.refresh().await?;
        }

        let cache = self.cache.read().await;
        let cached = cache
            .as_ref()
            .ok_or_else(|| JwksError::NetworkError("cache empty after refresh".to_string()))?;

        let keys: Vec<_> = cached
            .jwks
            .keys
            .iter()
            .filter(|k| is_signing_key(k))
            .filter_map(|jwk| {
                DecodingKey::from_jwk(jwk)
                    .ok()
                    .map(|dk| (dk, jwk_algorithm(jwk)))
            })
            .collect();

        if keys.is_empty() {
            Err(JwksError::NoSigningKeys)
        } else {
            Ok(keys)
        }
    }

    /// Fetches the key set and replaces the cached copy.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        tracing::debug!(uri = %self.jwks_uri, "Fetching JWKS");

        let response = self
            .http_client
            .get(self.jwks_uri.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(uri = %self.jwks_uri, error = %e, "Failed to fetch JWKS");
                JwksError::NetworkError(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(JwksError::HttpError(response.status().as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_response_size
        {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.config.max_response_size,
            });
        }

        let ttl = ttl_from_headers(response.headers(), &self.config);

        let body = response
            .bytes()
            .await
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;
        if body.len() > self.config.max_response_size {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.config.max_response_size,
            });
        }
        let jwks: JwkSet = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(uri = %self.jwks_uri, error = %e, "Failed to parse JWKS");
            JwksError::ParseError(e.to_string())
        })?;

        tracing::debug!(uri = %self.jwks_uri, keys = jwks.keys.len(), ?ttl, "Cached JWKS");

        *self.cache.write().await = Some(CachedJwks {
            jwks,
            expires_at: Instant::now() + ttl,
        });
        Ok(())
    }

    /// Drops the cached key set.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
        tracing::debug!(uri = %self.jwks_uri, "Invalidated JWKS cache");
    }

    /// `true` if a non-expired key set is cached.
    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.as_ref().is_some_and(|c| c.is_fresh())
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    async fn resolve(&self, header: &Header) -> Result<ResolvedKey, AuthError> {
        if let Some(kid) = header.kid.as_deref() {
            let (key, algorithm) = self.get_key(kid).await?;
            return Ok(ResolvedKey { key, algorithm });
        }

        // Without a kid, take the first key whose declared algorithm agrees
        // with the header (or that declares none).
        self.signing_keys()
            .await?
            .into_iter()
            .find(|(_, alg)| alg.is_none_or(|a| a == header.alg))
            .map(|(key, algorithm)| ResolvedKey { key, algorithm })
            .ok_or_else(|| AuthError::key_resolution("no signing key matches token algorithm"))
    }
}

fn validate_scheme(uri: &Url, allow_http: bool) -> Result<(), JwksError> {
    match uri.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        _ => Err(JwksError::InvalidScheme),
    }
}

/// Reads `max-age` from `Cache-Control`, clamped to `[min_ttl, max_ttl]`.
fn ttl_from_headers(headers: &reqwest::header::HeaderMap, config: &JwksCacheConfig) -> Duration {
    let ttl = headers
        .get(reqwest::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.split(',').find_map(|directive| {
                directive
                    .trim()
                    .strip_prefix("max-age=")
                    .and_then(|secs| secs.parse::<u64>().ok())
            })
        })
        .map(Duration::from_secs)
        .unwrap_or(config.default_ttl);

    ttl.min(config.max_ttl).max(config.min_ttl)
}

fn is_signing_key(jwk: &Jwk) -> bool {
    !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption))
}

fn jwk_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}
