//! Bearer token verification.

pub mod jwks;
pub mod validator;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Header};

use crate::error::AuthError;

pub use jwks::{JwksError, JwksKeyResolver};
pub use validator::TokenValidator;

/// A verification key plus the algorithm it is bound to, if declared.
#[derive(Clone)]
pub struct ResolvedKey {
    pub key: DecodingKey,
    pub algorithm: Option<Algorithm>,
}

/// Supplies the key that should verify a given token header.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, header: &Header) -> Result<ResolvedKey, AuthError>;
}

/// A resolver that always returns one fixed key.
///
/// Used for local development against a shared secret, and in tests.
#[derive(Clone)]
pub struct StaticKeyResolver {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl StaticKeyResolver {
    /// HS256 shared secret.
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// RSA public key in PEM form.
    pub fn rsa_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self, AuthError> {
        Ok(Self {
            key: DecodingKey::from_rsa_pem(pem)?,
            algorithm,
        })
    }

    /// EC public key in PEM form.
    pub fn ec_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self, AuthError> {
        Ok(Self {
            key: DecodingKey::from_ec_pem(pem)?,
            algorithm,
        })
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, _header: &Header) -> Result<ResolvedKey, AuthError> {
        Ok(ResolvedKey {
            key: self.key.clone(),
            algorithm: Some(self.algorithm),
        })
    }
}
