use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use ephra_auth::middleware::BearerAuth;
use ephra_scheduling::{Appointment, AppointmentPatch, CreateAppointment, Page};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Body of `PUT /appointments/{id}/reschedule`.
#[derive(Debug, Deserialize)]
pub struct RescheduleBody {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

pub async fn create_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Json(body): Json<CreateAppointment>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = state.lifecycle.create(&principal, body).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(state.lifecycle.list_visible(&principal, page).await?))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.lifecycle.get(&principal, id).await?))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(id): Path<Uuid>,
    Json(patch): Json<AppointmentPatch>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.lifecycle.update(&principal, id, patch).await?))
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<RescheduleBody>,
) -> ApiResult<Json<Appointment>> {
    let appointment = state
        .lifecycle
        .reschedule(&principal, id, body.start_time, body.end_time)
        .await?;
    Ok(Json(appointment))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.lifecycle.cancel(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.lifecycle.confirm(&principal, id).await?))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.lifecycle.complete(&principal, id).await?))
}
