//! HTTP routes grouped by resource.

pub mod appointments;
pub mod availability;
pub mod health;
pub mod sessions;
pub mod webhooks;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/healthz", get(health::healthz))
        .route(
            "/appointments",
            post(appointments::create_appointment).get(appointments::list_appointments),
        )
        .route(
            "/appointments/{id}",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::cancel_appointment),
        )
        .route(
            "/appointments/{id}/reschedule",
            put(appointments::reschedule_appointment),
        )
        .route(
            "/appointments/{id}/confirm",
            post(appointments::confirm_appointment),
        )
        .route(
            "/appointments/{id}/complete",
            post(appointments::complete_appointment),
        )
        .route(
            "/care-providers/{provider_id}/availability",
            get(availability::list_slots).post(availability::create_slot),
        )
        .route(
            "/care-providers/{provider_id}/suggestions",
            get(availability::suggest_ranges),
        )
        .route(
            "/availability/{slot_id}",
            put(availability::update_slot).delete(availability::delete_slot),
        )
        .route("/webhooks/email", post(webhooks::email_event))
        .route("/webhooks/email/test", get(webhooks::email_status))
        .route("/admin/sessions", post(sessions::create_session))
        .route(
            "/admin/sessions/current",
            get(sessions::current_session).delete(sessions::end_session),
        )
}
