//! Server-side sessions for the admin surface.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use ephra_auth::middleware::{BearerAuth, SessionAuth};
use ephra_auth::{Role, Session, permission, scopes};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub subject_id: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            subject_id: session.principal.subject_id().to_string(),
            role: session.principal.role(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Exchanges an admin bearer token for a session id.
pub async fn create_session(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    permission::require_scope(&principal, scopes::ACCESS_ADMIN_PANEL)?;
    let session = state.auth.sessions.create(principal).await?;
    tracing::info!(subject = %session.principal.subject_id(), "Admin session opened");
    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

pub async fn current_session(SessionAuth(session): SessionAuth) -> Json<SessionView> {
    Json(SessionView::from(&session))
}

pub async fn end_session(
    State(state): State<AppState>,
    SessionAuth(session): SessionAuth,
) -> ApiResult<StatusCode> {
    state.auth.sessions.invalidate(&session.id).await?;
    tracing::info!(subject = %session.principal.subject_id(), "Admin session closed");
    Ok(StatusCode::NO_CONTENT)
}
