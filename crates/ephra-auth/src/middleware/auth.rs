//! Request extractors.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::principal::Principal;
use crate::session::{Session, SessionStore};
use crate::token::TokenValidator;

/// Header carrying an admin session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// State required by [`BearerAuth`] and [`SessionAuth`].
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<TokenValidator>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AuthState {
    pub fn new(validator: Arc<TokenValidator>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            validator,
            sessions,
        }
    }
}

/// Validates `Authorization: Bearer <token>` and yields the caller's
/// [`Principal`].
pub struct BearerAuth(pub Principal);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AuthError::unauthorized("Malformed Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthorized("Expected a Bearer token"))?;

        let principal = auth_state.validator.validate(token).await.map_err(|e| {
            tracing::debug!(error = %e, category = %e.category(), "Bearer token rejected");
            e
        })?;

        Ok(BearerAuth(principal))
    }
}

/// Resolves the session named by the [`SESSION_HEADER`] header.
pub struct SessionAuth(pub Session);

impl<S> FromRequestParts<S> for SessionAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::unauthorized("Missing session id"))?;

        auth_state
            .sessions
            .get(id)
            .await?
            .map(SessionAuth)
            .ok_or_else(|| AuthError::unauthorized("Session expired or not found"))
    }
}
