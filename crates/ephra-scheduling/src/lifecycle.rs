//! Appointment lifecycle: booking, rescheduling, status changes and
//! reminder bookkeeping.
//!
//! Every write that depends on the provider's schedule runs under that
//! provider's lock, from the first read to the final save. Reminder
//! failures are logged and never fail the operation.

use std::sync::Arc;

use ephra_auth::{AccessGrant, Principal, Role, permission, scopes};
use ephra_core::{Clock, ServiceError, TimeRange};
use ephra_notifications::{DeliveryEvent, ReminderRequest, ReminderService};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::lock::ProviderLocks;
use crate::models::{Appointment, AppointmentStatus, ProviderProfile, ReminderTracking};
use crate::resolver::{ScheduleRequest, SchedulingResolver};
use crate::store::{AppointmentFilter, SchedulingStores};
use crate::suggest;

/// Body of a booking request.
///
/// Which ids are required depends on the acting role: users book for
/// themselves with a provider, providers book a user into their own
/// schedule, admins name the provider and optionally the user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointment {
    pub user_id: Option<String>,
    pub care_provider_id: Option<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,

    pub notes: Option<String>,
    pub meeting_link: Option<String>,
    pub reminder_minutes: Option<u32>,
}

/// Non-time fields an update may change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    pub notes: Option<String>,
    pub meeting_link: Option<String>,
    pub status: Option<AppointmentStatus>,
}

/// Offset pagination for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

impl Page {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if !(1..=1000).contains(&self.limit) {
            return Err(ServiceError::validation("Limit must be between 1 and 1000"));
        }
        Ok(())
    }
}

pub struct AppointmentLifecycle {
    stores: SchedulingStores,
    reminders: Arc<dyn ReminderService>,
    locks: Arc<ProviderLocks>,
    resolver: SchedulingResolver,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl AppointmentLifecycle {
    pub fn new(
        stores: SchedulingStores,
        reminders: Arc<dyn ReminderService>,
        locks: Arc<ProviderLocks>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            stores,
            reminders,
            locks,
            resolver: SchedulingResolver::from_config(&config),
            clock,
            config,
        }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        request: CreateAppointment,
    ) -> Result<Appointment, ServiceError> {
        permission::require_scope(principal, scopes::CREATE_APPOINTMENTS)?;
        let role = principal.role();
        let (user_id, provider_id) = resolve_parties(principal, role, &request)?;

        let grant = permission::appointment_management_grant(principal, &user_id).ok_or_else(|| {
            ServiceError::permission(
                "You can only manage your own appointments",
                [scopes::VIEW_ASSIGNED_USERS, scopes::MANAGE_ALL_USERS],
            )
        })?;
        if grant == AccessGrant::Assigned
            && !self
                .stores
                .assignments
                .is_assigned(&user_id, principal.subject_id())
                .await?
        {
            debug!(user_id = %user_id, provider_id = %principal.subject_id(), "No assignment");
            return Err(ServiceError::forbidden("User is not assigned to you"));
        }

        if !self.stores.directory.is_active_user(&user_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }
        let profile = self.active_provider(&provider_id).await?;

        let _guard = self.locks.acquire(&provider_id).await?;

        let slots = self.stores.availability.list_slots(&provider_id).await?;
        let booked = self
            .stores
            .appointments
            .list_active_for_provider(&provider_id)
            .await?;
        let now = self.clock.now();
        let range = self.resolver.evaluate(&ScheduleRequest {
            provider_id: &provider_id,
            start: request.start_time,
            end: request.end_time,
            acting_role: role,
            profile: Some(&profile),
            slots: &slots,
            appointments: &booked,
            exclude_appointment_id: None,
            now,
        })?;

        let id = Uuid::new_v4();
        let mut appointment = Appointment {
            id,
            user_id,
            care_provider_id: provider_id,
            time_range: range,
            status: AppointmentStatus::Pending,
            reminder_minutes: request
                .reminder_minutes
                .unwrap_or(self.config.default_reminder_minutes),
            meeting_link: Some(
                request
                    .meeting_link
                    .unwrap_or_else(|| self.config.meeting_link(id)),
            ),
            notes: request.notes,
            reminder: ReminderTracking::default(),
            created_at: now,
            updated_at: now,
        };
        self.stores.appointments.save_appointment(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            user_id = %appointment.user_id,
            provider_id = %appointment.care_provider_id,
            range = %appointment.time_range,
            "Appointment created"
        );

        if self.schedule_reminder(&mut appointment).await {
            self.stores.appointments.save_appointment(&appointment).await?;
        }
        Ok(appointment)
    }

    pub async fn reschedule(
        &self,
        principal: &Principal,
        id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Appointment, ServiceError> {
        permission::require_scope(principal, scopes::UPDATE_APPOINTMENTS)?;
        let provider_id = self.load_accessible(principal, id).await?.care_provider_id;

        let _guard = self.locks.acquire(&provider_id).await?;
        let mut appointment = self.load_accessible(principal, id).await?;
        if appointment.status.is_terminal() {
            return Err(ServiceError::business_rule(format!(
                "Cannot reschedule a {} appointment",
                appointment.status
            )));
        }

        let profile = self.stores.directory.provider_profile(&provider_id).await?;
        let slots = self.stores.availability.list_slots(&provider_id).await?;
        let booked = self
            .stores
            .appointments
            .list_active_for_provider(&provider_id)
            .await?;
        let now = self.clock.now();
        let range = self.resolver.evaluate(&ScheduleRequest {
            provider_id: &provider_id,
            start,
            end,
            acting_role: principal.role(),
            profile: profile.as_ref(),
            slots: &slots,
            appointments: &booked,
            exclude_appointment_id: Some(id),
            now,
        })?;

        let previous = appointment.time_range;
        appointment.time_range = range;
        appointment.updated_at = now;
        self.stores.appointments.save_appointment(&appointment).await?;

        // The old reminder is only dropped once the new time is stored.
        let had_reminder = appointment.reminder.email_message_id.is_some();
        self.cancel_reminder(&mut appointment).await;
        if self.schedule_reminder(&mut appointment).await || had_reminder {
            self.stores.appointments.save_appointment(&appointment).await?;
        }

        info!(
            appointment_id = %id,
            from = %previous,
            to = %range,
            "Appointment rescheduled"
        );
        Ok(appointment)
    }

    pub async fn cancel(&self, principal: &Principal, id: Uuid) -> Result<Appointment, ServiceError> {
        permission::require_scope(principal, scopes::CANCEL_APPOINTMENTS)?;
        self.transition(principal, id, AppointmentStatus::Cancelled)
            .await
    }

    pub async fn confirm(&self, principal: &Principal, id: Uuid) -> Result<Appointment, ServiceError> {
        permission::require_scope(principal, scopes::UPDATE_APPOINTMENTS)?;
        self.transition(principal, id, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn complete(&self, principal: &Principal, id: Uuid) -> Result<Appointment, ServiceError> {
        permission::require_scope(principal, scopes::UPDATE_APPOINTMENTS)?;
        self.transition(principal, id, AppointmentStatus::Completed)
            .await
    }

    /// Patches notes, meeting link or status. Time fields go through
    /// [`Self::reschedule`].
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, ServiceError> {
        permission::require_scope(principal, scopes::UPDATE_APPOINTMENTS)?;
        if patch.status == Some(AppointmentStatus::Cancelled) {
            permission::require_scope(principal, scopes::CANCEL_APPOINTMENTS)?;
        }

        let provider_id = self.load_accessible(principal, id).await?.care_provider_id;
        let _guard = self.locks.acquire(&provider_id).await?;
        let mut appointment = self.load_accessible(principal, id).await?;

        let cancelled = match patch.status {
            Some(target) => self.apply_status(&mut appointment, target)?,
            None => false,
        };
        if let Some(notes) = patch.notes {
            appointment.notes = Some(notes);
        }
        if let Some(link) = patch.meeting_link {
            appointment.meeting_link = Some(link);
        }
        appointment.updated_at = self.clock.now();
        self.stores.appointments.save_appointment(&appointment).await?;
        if cancelled {
            self.release_reminder(&mut appointment).await?;
        }

        debug!(appointment_id = %id, "Appointment updated");
        Ok(appointment)
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Appointment, ServiceError> {
        self.load_accessible(principal, id).await
    }

    /// Appointments the principal may see, ordered by start time.
    pub async fn list_visible(
        &self,
        principal: &Principal,
        page: Page,
    ) -> Result<Vec<Appointment>, ServiceError> {
        page.validate()?;
        let subject = principal.subject_id().to_string();
        let filter = match principal.role() {
            Role::Admin => AppointmentFilter::All,
            Role::CareProvider => AppointmentFilter::Provider(subject),
            Role::User => AppointmentFilter::User(subject),
        };

        let mut appointments = self.stores.appointments.list_appointments(&filter).await?;
        appointments.sort_by_key(|a| a.time_range.start());
        Ok(appointments
            .into_iter()
            .skip(page.skip)
            .take(page.limit)
            .collect())
    }

    /// Applies an email provider callback. Unknown appointments are ignored.
    pub async fn record_delivery_event(
        &self,
        id: Uuid,
        event: DeliveryEvent,
    ) -> Result<Option<Appointment>, ServiceError> {
        let Some(appointment) = self.stores.appointments.get_appointment(id).await? else {
            warn!(appointment_id = %id, event = %event, "Delivery event for unknown appointment");
            return Ok(None);
        };

        let _guard = self.locks.acquire(&appointment.care_provider_id).await?;
        let Some(mut appointment) = self.stores.appointments.get_appointment(id).await? else {
            return Ok(None);
        };

        match event {
            DeliveryEvent::Delivered => appointment.reminder.delivered = true,
            DeliveryEvent::Opened => {
                appointment.reminder.delivered = true;
                appointment.reminder.opened = true;
            }
        }
        appointment.updated_at = self.clock.now();
        self.stores.appointments.save_appointment(&appointment).await?;

        debug!(appointment_id = %id, event = %event, "Delivery status recorded");
        Ok(Some(appointment))
    }

    /// Free ranges on the UTC day containing `day` for one provider.
    pub async fn suggest_free_ranges(
        &self,
        provider_id: &str,
        day: OffsetDateTime,
    ) -> Result<Vec<TimeRange>, ServiceError> {
        self.active_provider(provider_id).await?;
        let booked = self
            .stores
            .appointments
            .list_active_for_provider(provider_id)
            .await?;
        Ok(suggest::free_ranges(
            &booked,
            &TimeRange::utc_day_of(day),
            self.clock.now(),
            self.resolver.suggestion_lead(),
        ))
    }

    async fn transition(
        &self,
        principal: &Principal,
        id: Uuid,
        target: AppointmentStatus,
    ) -> Result<Appointment, ServiceError> {
        let provider_id = self.load_accessible(principal, id).await?.care_provider_id;
        let _guard = self.locks.acquire(&provider_id).await?;
        let mut appointment = self.load_accessible(principal, id).await?;

        let cancelled = self.apply_status(&mut appointment, target)?;
        appointment.updated_at = self.clock.now();
        self.stores.appointments.save_appointment(&appointment).await?;
        if cancelled {
            self.release_reminder(&mut appointment).await?;
        }
        Ok(appointment)
    }

    /// Moves the appointment through the state machine. Returns `true` when
    /// this call cancelled it.
    fn apply_status(
        &self,
        appointment: &mut Appointment,
        target: AppointmentStatus,
    ) -> Result<bool, ServiceError> {
        let from = appointment.status;
        let to = from.transition_to(target)?;
        if from == to {
            return Ok(false);
        }

        appointment.status = to;
        info!(appointment_id = %appointment.id, from = %from, to = %to, "Appointment status changed");
        Ok(to == AppointmentStatus::Cancelled)
    }

    /// Cancels the reminder of an already stored cancellation and stores
    /// the cleared tracking.
    async fn release_reminder(&self, appointment: &mut Appointment) -> Result<(), ServiceError> {
        if appointment.reminder.email_message_id.is_none() {
            return Ok(());
        }
        self.cancel_reminder(appointment).await;
        self.stores.appointments.save_appointment(appointment).await
    }

    async fn load_accessible(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Appointment, ServiceError> {
        let appointment = self
            .stores
            .appointments
            .get_appointment(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment", id.to_string()))?;
        ensure_access(principal, &appointment)?;
        Ok(appointment)
    }

    async fn active_provider(&self, provider_id: &str) -> Result<ProviderProfile, ServiceError> {
        self.stores
            .directory
            .provider_profile(provider_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::not_found("Care provider", provider_id))
    }

    /// Returns `true` when the reminder tracking changed.
    async fn schedule_reminder(&self, appointment: &mut Appointment) -> bool {
        let request = ReminderRequest {
            appointment_id: appointment.id.to_string(),
            user_id: appointment.user_id.clone(),
            care_provider_id: appointment.care_provider_id.clone(),
            appointment_start: appointment.time_range.start(),
            deliver_at: appointment.reminder_at(),
            meeting_link: appointment.meeting_link.clone(),
        };

        match self.reminders.schedule_reminder(&request).await {
            Ok(Some(message_id)) => {
                appointment.reminder = ReminderTracking {
                    email_message_id: Some(message_id),
                    scheduled: true,
                    ..ReminderTracking::default()
                };
                true
            }
            Ok(None) => {
                debug!(appointment_id = %appointment.id, "Reminder not scheduled");
                false
            }
            Err(e) => {
                warn!(appointment_id = %appointment.id, error = %e, "Failed to schedule reminder");
                false
            }
        }
    }

    async fn cancel_reminder(&self, appointment: &mut Appointment) {
        let Some(message_id) = appointment.reminder.email_message_id.take() else {
            return;
        };
        appointment.reminder.scheduled = false;

        match self.reminders.cancel_reminder(&message_id).await {
            Ok(true) => debug!(appointment_id = %appointment.id, message_id, "Reminder cancelled"),
            Ok(false) => debug!(appointment_id = %appointment.id, message_id, "Reminder already sent"),
            Err(e) => warn!(
                appointment_id = %appointment.id,
                message_id,
                error = %e,
                "Failed to cancel reminder"
            ),
        }
    }
}

/// Works out `(user_id, provider_id)` for a booking from the acting role.
fn resolve_parties(
    principal: &Principal,
    role: Role,
    request: &CreateAppointment,
) -> Result<(String, String), ServiceError> {
    let me = principal.subject_id();
    let provider_required =
        || ServiceError::validation("care_provider_id is required");

    match role {
        Role::User => {
            if request.user_id.as_deref().is_some_and(|id| id != me) {
                return Err(ServiceError::forbidden(
                    "You can only book appointments for yourself",
                ));
            }
            let provider = request.care_provider_id.clone().ok_or_else(provider_required)?;
            Ok((me.to_string(), provider))
        }
        Role::CareProvider => {
            let user = request.user_id.clone().ok_or_else(|| {
                ServiceError::validation("user_id is required when care provider creates appointment")
            })?;
            if request.care_provider_id.as_deref().is_some_and(|id| id != me) {
                return Err(ServiceError::forbidden(
                    "Care providers can only book into their own schedule",
                ));
            }
            Ok((user, me.to_string()))
        }
        Role::Admin => {
            let user = request.user_id.clone().unwrap_or_else(|| me.to_string());
            let provider = request.care_provider_id.clone().ok_or_else(provider_required)?;
            Ok((user, provider))
        }
    }
}

/// Participants and admins may act on an appointment.
fn ensure_access(principal: &Principal, appointment: &Appointment) -> Result<(), ServiceError> {
    let role = principal.role();
    if role == Role::Admin || appointment.involves(principal.subject_id()) {
        return Ok(());
    }
    let message = match role {
        Role::CareProvider => "You can only access appointments where you are the care provider",
        _ => "You can only access your own appointments",
    };
    Err(ServiceError::forbidden(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn booking(user_id: Option<&str>, provider_id: Option<&str>) -> CreateAppointment {
        CreateAppointment {
            user_id: user_id.map(str::to_string),
            care_provider_id: provider_id.map(str::to_string),
            start_time: datetime!(2030-05-01 10:00 UTC),
            end_time: datetime!(2030-05-01 11:00 UTC),
            notes: None,
            meeting_link: None,
            reminder_minutes: None,
        }
    }

    #[test]
    fn test_resolve_parties_by_role() {
        let user = Principal::with_role_scopes("user-1", Role::User);
        assert_eq!(
            resolve_parties(&user, Role::User, &booking(None, Some("prov-1"))).unwrap(),
            ("user-1".to_string(), "prov-1".to_string())
        );
        assert!(resolve_parties(&user, Role::User, &booking(None, None)).is_err());
        assert_eq!(
            resolve_parties(&user, Role::User, &booking(Some("user-2"), Some("prov-1")))
                .unwrap_err()
                .status_code(),
            403
        );

        let provider = Principal::with_role_scopes("prov-1", Role::CareProvider);
        assert_eq!(
            resolve_parties(&provider, Role::CareProvider, &booking(Some("user-1"), None)).unwrap(),
            ("user-1".to_string(), "prov-1".to_string())
        );
        assert_eq!(
            resolve_parties(&provider, Role::CareProvider, &booking(None, None)).unwrap_err(),
            ServiceError::validation("user_id is required when care provider creates appointment")
        );

        let admin = Principal::with_role_scopes("admin-1", Role::Admin);
        assert_eq!(
            resolve_parties(&admin, Role::Admin, &booking(None, Some("prov-1"))).unwrap(),
            ("admin-1".to_string(), "prov-1".to_string())
        );
    }

    #[test]
    fn test_page_bounds() {
        assert!(Page::default().validate().is_ok());
        assert!(Page { skip: 0, limit: 0 }.validate().is_err());
        assert!(Page { skip: 5, limit: 1001 }.validate().is_err());
    }
}
