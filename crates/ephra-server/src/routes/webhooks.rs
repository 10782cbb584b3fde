//! Email provider delivery callbacks.

use std::str::FromStr;

use axum::extract::State;
use axum::{Form, Json};
use ephra_core::ServiceError;
use ephra_notifications::DeliveryEvent;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Form fields posted by the email provider. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailEventForm {
    pub token: String,
    pub timestamp: String,
    pub signature: String,
    pub event: String,
    #[serde(rename = "Message-Id")]
    pub message_id: String,
    #[serde(alias = "v:appointment_id")]
    pub appointment_id: Option<String>,
    pub reason: Option<String>,
}

pub async fn email_event(
    State(state): State<AppState>,
    Form(form): Form<EmailEventForm>,
) -> ApiResult<Json<Value>> {
    if !state
        .webhooks
        .verify(&form.token, &form.timestamp, &form.signature)
    {
        warn!("Invalid email webhook signature");
        return Err(ServiceError::authentication("Invalid webhook signature").into());
    }

    info!(event = %form.event, message_id = %form.message_id, "Email webhook received");

    let Some(raw_id) = form.appointment_id.filter(|id| !id.is_empty()) else {
        warn!(message_id = %form.message_id, "No appointment id in email webhook");
        return Ok(Json(json!({"status": "ignored", "reason": "no appointment ID"})));
    };
    let Ok(appointment_id) = Uuid::parse_str(&raw_id) else {
        warn!(appointment_id = %raw_id, "Malformed appointment id in email webhook");
        return Ok(Json(json!({"status": "ignored", "reason": "invalid appointment ID"})));
    };

    match form.event.as_str() {
        "failed" => error!(
            appointment_id = %appointment_id,
            reason = form.reason.as_deref().unwrap_or("Unknown"),
            "Reminder email delivery failed"
        ),
        "clicked" => info!(appointment_id = %appointment_id, "Reminder email link clicked"),
        other => match DeliveryEvent::from_str(other) {
            Ok(event) => {
                state
                    .lifecycle
                    .record_delivery_event(appointment_id, event)
                    .await?;
            }
            Err(_) => info!(event = other, "Unhandled email webhook event"),
        },
    }

    Ok(Json(json!({
        "status": "processed",
        "event": form.event,
        "appointment_id": appointment_id,
    })))
}

pub async fn email_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Email webhook endpoint is accessible",
        "configured": state.webhooks.is_configured(),
    }))
}
