//! Access token validation.
//!
//! Turns a raw bearer token into a [`Principal`]. A token is rejected when
//! its signature does not verify, it is malformed or expired, the issuer
//! is wrong, the subject is missing, or the configured API resource is not
//! in its audience. A missing or empty `scope` claim is not an error: the
//! principal simply holds no scopes and later permission checks fail.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::Deserialize;

use super::jwks::JwksKeyResolver;
use super::KeyResolver;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::principal::Principal;
use crate::scopes::Role;

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            Self::One(aud) => BTreeSet::from([aud]),
            Self::Many(auds) => auds.into_iter().collect(),
        }
    }
}

/// Claims read from an access token. `exp` and `iss` are checked by
/// `jsonwebtoken` itself.
#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

const DEFAULT_ALGORITHMS: [Algorithm; 3] = [
    Algorithm::RS256,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Validates bearer tokens issued by the configured identity provider.
pub struct TokenValidator {
    resolver: Option<Arc<dyn KeyResolver>>,
    issuer: String,
    api_resource: String,
    algorithms: Vec<Algorithm>,
    leeway: Duration,
}

impl TokenValidator {
    pub fn new(
        resolver: Arc<dyn KeyResolver>,
        issuer: impl Into<String>,
        api_resource: impl Into<String>,
    ) -> Self {
        Self {
            resolver: Some(resolver),
            issuer: issuer.into(),
            api_resource: api_resource.into(),
            algorithms: DEFAULT_ALGORITHMS.to_vec(),
            leeway: Duration::from_secs(30),
        }
    }

    /// A validator that rejects every token with [`AuthError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self {
            resolver: None,
            issuer: String::new(),
            api_resource: String::new(),
            algorithms: Vec::new(),
            leeway: Duration::ZERO,
        }
    }

    /// Builds a JWKS-backed validator from configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let (Some(issuer), Some(jwks_uri)) = (
            config.issuer(),
            config
                .jwks_uri()
                .map_err(|e| AuthError::configuration(e.to_string()))?,
        ) else {
            tracing::warn!("Identity provider endpoint not configured; authentication disabled");
            return Ok(Self::unconfigured());
        };

        let algorithms = config
            .parsed_algorithms()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let resolver = JwksKeyResolver::new(jwks_uri, config.jwks.clone())
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        Ok(Self::new(Arc::new(resolver), issuer, config.api_resource.clone())
            .with_algorithms(algorithms)
            .with_leeway(config.leeway))
    }

    #[must_use]
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.resolver.is_some()
    }

    /// Validates `raw` and extracts the caller's principal.
    pub async fn validate(&self, raw: &str) -> Result<Principal, AuthError> {
        let resolver = self.resolver.as_ref().ok_or(AuthError::NotConfigured)?;

        let header = decode_header(raw)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::unsupported_algorithm(format!("{:?}", header.alg)));
        }

        let resolved = resolver.resolve(&header).await?;
        if resolved.algorithm.is_some_and(|alg| alg != header.alg) {
            return Err(AuthError::unsupported_algorithm(format!(
                "{:?} does not match signing key",
                header.alg
            )));
        }

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_exp = true;
        // Audience is checked below so that both the string and array
        // forms are handled the same way.
        validation.validate_aud = false;
        validation.leeway = self.leeway.as_secs();

        let claims = decode::<AccessTokenClaims>(raw, &resolved.key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::invalid_issuer(&self.issuer)
                }
                _ => AuthError::from(e),
            })?
            .claims;

        let audience = claims.aud.map(Audience::into_set).unwrap_or_default();
        if !audience.contains(&self.api_resource) {
            tracing::debug!(expected = %self.api_resource, ?audience, "Token audience rejected");
            return Err(AuthError::invalid_audience(&self.api_resource));
        }

        let subject = claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;

        let scopes = claims
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string);

        let mut principal = Principal::new(subject)
            .with_scopes(scopes)
            .with_audience(audience);
        if let Some(client_id) = claims.client_id {
            principal = principal.with_client_id(client_id);
        }
        if let Some(organization_id) = claims.organization_id {
            principal = principal.with_organization_id(organization_id);
        }
        if let Some(role) = claims.role.as_deref() {
            match role.parse::<Role>() {
                Ok(role) => principal = principal.with_role(role),
                Err(e) => tracing::debug!(error = %e, "Ignoring unrecognised role claim"),
            }
        }

        tracing::trace!(
            subject = %principal.subject_id(),
            scopes = principal.scopes().len(),
            "Token validated"
        );
        Ok(principal)
    }
}
