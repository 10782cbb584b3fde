use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use ephra_auth::middleware::BearerAuth;
use ephra_core::TimeRange;
use ephra_scheduling::{AvailabilitySlot, NewSlot, SlotUpdate};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    /// Any instant on the UTC day to search
    #[serde(with = "time::serde::rfc3339")]
    pub day: OffsetDateTime,
}

pub async fn list_slots(
    State(state): State<AppState>,
    BearerAuth(_principal): BearerAuth,
    Path(provider_id): Path<String>,
) -> ApiResult<Json<Vec<AvailabilitySlot>>> {
    Ok(Json(state.availability.list_slots(&provider_id).await?))
}

pub async fn create_slot(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(provider_id): Path<String>,
    Json(body): Json<NewSlot>,
) -> ApiResult<(StatusCode, Json<AvailabilitySlot>)> {
    let slot = state
        .availability
        .create_slot(&principal, &provider_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

pub async fn update_slot(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(slot_id): Path<Uuid>,
    Json(body): Json<SlotUpdate>,
) -> ApiResult<Json<AvailabilitySlot>> {
    Ok(Json(
        state.availability.update_slot(&principal, slot_id, body).await?,
    ))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    Path(slot_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.availability.delete_slot(&principal, slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn suggest_ranges(
    State(state): State<AppState>,
    BearerAuth(_principal): BearerAuth,
    Path(provider_id): Path<String>,
    Query(query): Query<SuggestionQuery>,
) -> ApiResult<Json<Vec<TimeRange>>> {
    Ok(Json(
        state
            .lifecycle
            .suggest_free_ranges(&provider_id, query.day)
            .await?,
    ))
}
