//! Authentication error types.
//!
//! Token-level failures are kept distinct here so they can be logged and
//! rendered precisely, then folded into [`ServiceError`] at the service
//! boundary.

use std::fmt;

use ephra_core::ServiceError;

use crate::token::jwks::JwksError;

/// Errors raised while authenticating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credentials were presented, or the header was malformed.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of what was missing.
        message: String,
    },

    /// The token is malformed or cannot be parsed.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The signature does not verify against the current key set.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The token was signed with an algorithm outside the allowed list.
    #[error("Unsupported signing algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// The algorithm named in the token header.
        algorithm: String,
    },

    /// The `iss` claim does not name the configured identity provider.
    #[error("Invalid issuer, expected {expected}")]
    InvalidIssuer {
        /// The configured issuer.
        expected: String,
    },

    /// The `aud` claim does not include the configured API resource.
    #[error("Invalid audience, expected {expected}")]
    InvalidAudience {
        /// The configured API resource identifier.
        expected: String,
    },

    /// The token has no usable `sub` claim.
    #[error("Token is missing the subject claim")]
    MissingSubject,

    /// The signing key could not be resolved.
    #[error("Signing key resolution failed: {message}")]
    KeyResolution {
        /// Description of the resolution failure.
        message: String,
    },

    /// The identity provider is not configured.
    #[error("Identity provider not configured")]
    NotConfigured,

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// A session lookup failed.
    #[error("Session error: {message}")]
    Session {
        /// Description of the session failure.
        message: String,
    },
}

impl AuthError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    #[must_use]
    pub fn invalid_issuer(expected: impl Into<String>) -> Self {
        Self::InvalidIssuer {
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn invalid_audience(expected: impl Into<String>) -> Self {
        Self::InvalidAudience {
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn key_resolution(message: impl Into<String>) -> Self {
        Self::KeyResolution {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Returns `true` if a new token (or credentials) would be needed.
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Authentication
                | ErrorCategory::Token
                | ErrorCategory::Claims
                | ErrorCategory::KeyResolution
        )
    }

    /// Returns `true` if this is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured | Self::Configuration { .. } | Self::Session { .. }
        )
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::InvalidToken { .. }
            | Self::InvalidSignature
            | Self::TokenExpired
            | Self::UnsupportedAlgorithm { .. }
            | Self::MissingSubject => ErrorCategory::Token,
            Self::InvalidIssuer { .. } | Self::InvalidAudience { .. } => ErrorCategory::Claims,
            Self::KeyResolution { .. } => ErrorCategory::KeyResolution,
            Self::NotConfigured | Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Session { .. } => ErrorCategory::Infrastructure,
        }
    }
}

/// Categories of authentication errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Token,
    Claims,
    KeyResolution,
    Configuration,
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Claims => write!(f, "claims"),
            Self::KeyResolution => write!(f, "key_resolution"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::unsupported_algorithm(err.to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => Self::MissingSubject,
            ErrorKind::InvalidIssuer => Self::invalid_token("issuer mismatch"),
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::key_resolution(err.to_string()),
            _ => Self::invalid_token(err.to_string()),
        }
    }
}

impl From<JwksError> for AuthError {
    fn from(err: JwksError) -> Self {
        Self::key_resolution(err.to_string())
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        if err.is_server_error() {
            ServiceError::unavailable(err.to_string())
        } else {
            ServiceError::authentication(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephra_core::ErrorKind;

    #[test]
    fn test_error_display() {
        assert_eq!(AuthError::TokenExpired.to_string(), "Token expired");
        assert_eq!(
            AuthError::invalid_audience("https://api.ephra.test").to_string(),
            "Invalid audience, expected https://api.ephra.test"
        );
        assert_eq!(
            AuthError::MissingSubject.to_string(),
            "Token is missing the subject claim"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(AuthError::TokenExpired.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::invalid_issuer("x").category(),
            ErrorCategory::Claims
        );
        assert!(AuthError::invalid_audience("x").is_authentication_error());
        assert!(AuthError::NotConfigured.is_server_error());
        assert!(!AuthError::NotConfigured.is_authentication_error());
        assert_eq!(ErrorCategory::KeyResolution.to_string(), "key_resolution");
    }

    #[test]
    fn test_into_service_error() {
        let err: ServiceError = AuthError::invalid_audience("api").into();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.to_string().contains("Invalid audience"));

        let err: ServiceError = AuthError::NotConfigured.into();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_from_jwks_error() {
        let err: AuthError = JwksError::KeyNotFound("kid-1".into()).into();
        assert!(matches!(err, AuthError::KeyResolution { .. }));
        assert!(err.is_authentication_error());
    }
}
