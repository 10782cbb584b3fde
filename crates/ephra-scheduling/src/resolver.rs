//! Scheduling decisions for a proposed appointment range.
//!
//! [`SchedulingResolver::evaluate`] is pure: callers load the provider's
//! profile, slots and active appointments (under the provider lock) and
//! pass them in. Checks run in a fixed order and the first failure wins:
//!
//! 1. the range is well-formed
//! 2. it starts in the future
//! 3. its length is within policy bounds
//! 4. the provider declared availability (booking users only)
//! 5. it does not collide with another active appointment

use ephra_auth::Role;
use ephra_core::{ServiceError, TimeRange};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::models::{Appointment, AvailabilitySlot, ProviderProfile};
use crate::suggest;

/// Inputs for a single scheduling decision.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRequest<'a> {
    pub provider_id: &'a str,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub acting_role: Role,
    pub profile: Option<&'a ProviderProfile>,
    pub slots: &'a [AvailabilitySlot],
    pub appointments: &'a [Appointment],
    /// The appointment being rescheduled, ignored for conflicts
    pub exclude_appointment_id: Option<Uuid>,
    pub now: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingResolver {
    min_duration: Duration,
    max_duration: Duration,
    suggestion_lead: Duration,
}

impl Default for SchedulingResolver {
    fn default() -> Self {
        Self::from_config(&SchedulingConfig::default())
    }
}

impl SchedulingResolver {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self {
            min_duration: to_time(config.min_duration),
            max_duration: to_time(config.max_duration),
            suggestion_lead: to_time(config.suggestion_lead),
        }
    }

    pub fn suggestion_lead(&self) -> Duration {
        self.suggestion_lead
    }

    /// Returns the accepted range or the first rule it breaks.
    pub fn evaluate(&self, request: &ScheduleRequest<'_>) -> Result<TimeRange, ServiceError> {
        let range = self.validate_range(request.start, request.end, request.now)?;

        if request.acting_role == Role::User {
            check_availability(request, &range)?;
        } else {
            debug!(
                provider_id = %request.provider_id,
                role = %request.acting_role,
                "Availability check skipped"
            );
        }

        self.check_conflicts(request, &range)?;
        Ok(range)
    }

    /// Steps 1-3: shape, future start, and length bounds.
    pub fn validate_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<TimeRange, ServiceError> {
        let range = TimeRange::new(start, end)
            .map_err(|_| ServiceError::validation("Start time must be before end time"))?;

        if range.start() <= now {
            return Err(ServiceError::validation(
                "Appointment cannot be scheduled in the past",
            ));
        }

        let length = range.duration();
        if length < self.min_duration {
            return Err(ServiceError::validation(format!(
                "Appointment must be at least {} long",
                describe(self.min_duration)
            )));
        }
        if length > self.max_duration {
            return Err(ServiceError::validation(format!(
                "Appointment cannot be longer than {}",
                describe(self.max_duration)
            )));
        }

        Ok(range)
    }

    fn check_conflicts(
        &self,
        request: &ScheduleRequest<'_>,
        range: &TimeRange,
    ) -> Result<(), ServiceError> {
        let others: Vec<Appointment> = request
            .appointments
            .iter()
            .filter(|a| a.is_active() && Some(a.id) != request.exclude_appointment_id)
            .cloned()
            .collect();

        let Some(existing) = others.iter().find(|a| a.time_range.overlaps(range)) else {
            return Ok(());
        };

        debug!(
            provider_id = %request.provider_id,
            requested = %range,
            existing_id = %existing.id,
            "Scheduling conflict"
        );

        let day = TimeRange::utc_day_of(range.start());
        let suggestions = suggest::free_ranges(&others, &day, request.now, self.suggestion_lead);
        Err(ServiceError::conflict_with_suggestions(
            "The requested time slot conflicts with an existing appointment",
            suggestions,
        ))
    }
}

fn check_availability(request: &ScheduleRequest<'_>, range: &TimeRange) -> Result<(), ServiceError> {
    let profile = request
        .profile
        .ok_or_else(|| ServiceError::not_found("Care provider profile", request.provider_id))?;

    if !profile.is_accepting_patients {
        return Err(ServiceError::business_rule(
            "Care provider is not currently accepting new patients",
        ));
    }

    // No declared slots means an open schedule.
    if request.slots.is_empty() || request.slots.iter().any(|s| s.covers(range)) {
        return Ok(());
    }

    Err(ServiceError::conflict(
        "Care provider is not available during the requested time",
    ))
}

fn to_time(duration: std::time::Duration) -> Duration {
    Duration::try_from(duration).unwrap_or(Duration::MAX)
}

fn describe(duration: Duration) -> String {
    let minutes = duration.whole_minutes();
    match minutes {
        m if m % 60 == 0 && m >= 60 => {
            let hours = m / 60;
            format!("{hours} hour{}", if hours == 1 { "" } else { "s" })
        }
        m => format!("{m} minute{}", if m == 1 { "" } else { "s" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, ReminderTracking};
    use ephra_core::ErrorKind;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2030-05-01 08:00 UTC);

    fn slot(start: OffsetDateTime, end: OffsetDateTime) -> AvailabilitySlot {
        AvailabilitySlot {
            id: Uuid::new_v4(),
            provider_id: "prov-1".into(),
            time_range: TimeRange::new(start, end).unwrap(),
            is_available: true,
            created_at: NOW,
            updated_at: NOW,
        }
    }

    fn booked(start: OffsetDateTime, end: OffsetDateTime) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id: "user-2".into(),
            care_provider_id: "prov-1".into(),
            time_range: TimeRange::new(start, end).unwrap(),
            status: AppointmentStatus::Confirmed,
            reminder_minutes: 15,
            meeting_link: None,
            notes: None,
            reminder: ReminderTracking::default(),
            created_at: NOW,
            updated_at: NOW,
        }
    }

    fn request<'a>(
        start: OffsetDateTime,
        end: OffsetDateTime,
        role: Role,
        profile: &'a ProviderProfile,
        slots: &'a [AvailabilitySlot],
        appointments: &'a [Appointment],
    ) -> ScheduleRequest<'a> {
        ScheduleRequest {
            provider_id: "prov-1",
            start,
            end,
            acting_role: role,
            profile: Some(profile),
            slots,
            appointments,
            exclude_appointment_id: None,
            now: NOW,
        }
    }

    #[test]
    fn test_range_rules_in_order() {
        let resolver = SchedulingResolver::default();

        let err = resolver
            .validate_range(datetime!(2030-05-01 11:00 UTC), datetime!(2030-05-01 10:00 UTC), NOW)
            .unwrap_err();
        assert_eq!(err, ServiceError::validation("Start time must be before end time"));

        // Past and inverted: the shape check reports first.
        let err = resolver
            .validate_range(datetime!(2030-04-01 11:00 UTC), datetime!(2030-04-01 10:00 UTC), NOW)
            .unwrap_err();
        assert_eq!(err, ServiceError::validation("Start time must be before end time"));

        let err = resolver
            .validate_range(NOW, NOW + Duration::hours(1), NOW)
            .unwrap_err();
        assert_eq!(err, ServiceError::validation("Appointment cannot be scheduled in the past"));

        let start = datetime!(2030-05-01 10:00 UTC);
        let err = resolver
            .validate_range(start, start + Duration::minutes(10), NOW)
            .unwrap_err();
        assert_eq!(err, ServiceError::validation("Appointment must be at least 15 minutes long"));

        let err = resolver
            .validate_range(start, start + Duration::minutes(241), NOW)
            .unwrap_err();
        assert_eq!(err, ServiceError::validation("Appointment cannot be longer than 4 hours"));

        assert!(resolver.validate_range(start, start + Duration::minutes(15), NOW).is_ok());
        assert!(resolver.validate_range(start, start + Duration::hours(4), NOW).is_ok());
    }

    #[test]
    fn test_provider_bypasses_availability() {
        let resolver = SchedulingResolver::default();
        let profile = ProviderProfile::new("prov-1");
        let slots = [slot(datetime!(2030-05-01 09:00 UTC), datetime!(2030-05-01 12:00 UTC))];
        let start = datetime!(2030-05-01 14:00 UTC);
        let end = datetime!(2030-05-01 15:00 UTC);

        for role in [Role::CareProvider, Role::Admin] {
            assert!(resolver.evaluate(&request(start, end, role, &profile, &slots, &[])).is_ok());
        }

        let err = resolver
            .evaluate(&request(start, end, Role::User, &profile, &slots, &[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.suggestions().is_empty());
    }

    #[test]
    fn test_user_availability_rules() {
        let resolver = SchedulingResolver::default();
        let start = datetime!(2030-05-01 10:00 UTC);
        let end = datetime!(2030-05-01 11:00 UTC);

        // No slots declared: open schedule.
        let profile = ProviderProfile::new("prov-1");
        assert!(resolver.evaluate(&request(start, end, Role::User, &profile, &[], &[])).is_ok());

        let closed = ProviderProfile::new("prov-1").not_accepting();
        let err = resolver
            .evaluate(&request(start, end, Role::User, &closed, &[], &[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);

        let mut no_profile = request(start, end, Role::User, &profile, &[], &[]);
        no_profile.profile = None;
        assert_eq!(resolver.evaluate(&no_profile).unwrap_err().kind(), ErrorKind::NotFound);

        // Slots must contain the whole range and be marked available.
        let mut blocked = slot(datetime!(2030-05-01 09:00 UTC), datetime!(2030-05-01 12:00 UTC));
        blocked.is_available = false;
        let partial = slot(datetime!(2030-05-01 10:30 UTC), datetime!(2030-05-01 12:00 UTC));
        let slots = [blocked, partial];
        let err = resolver
            .evaluate(&request(start, end, Role::User, &profile, &slots, &[]))
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::conflict("Care provider is not available during the requested time")
        );
    }

    #[test]
    fn test_conflicts_and_touching_ranges() {
        let resolver = SchedulingResolver::default();
        let profile = ProviderProfile::new("prov-1");
        let existing = [booked(datetime!(2030-05-01 10:00 UTC), datetime!(2030-05-01 11:00 UTC))];

        let err = resolver
            .evaluate(&request(
                datetime!(2030-05-01 10:30 UTC),
                datetime!(2030-05-01 11:30 UTC),
                Role::CareProvider,
                &profile,
                &[],
                &existing,
            ))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let suggestions = err.suggestions();
        assert_eq!(suggestions[0].start(), datetime!(2030-05-01 08:20 UTC));
        assert_eq!(suggestions[0].end(), datetime!(2030-05-01 10:00 UTC));
        assert_eq!(suggestions[1].start(), datetime!(2030-05-01 11:00 UTC));

        assert!(
            resolver
                .evaluate(&request(
                    datetime!(2030-05-01 11:00 UTC),
                    datetime!(2030-05-01 12:00 UTC),
                    Role::CareProvider,
                    &profile,
                    &[],
                    &existing,
                ))
                .is_ok()
        );
    }

    #[test]
    fn test_excluded_and_inactive_appointments_do_not_conflict() {
        let resolver = SchedulingResolver::default();
        let profile = ProviderProfile::new("prov-1");
        let mut cancelled = booked(datetime!(2030-05-01 13:00 UTC), datetime!(2030-05-01 14:00 UTC));
        cancelled.status = AppointmentStatus::Cancelled;
        let own = booked(datetime!(2030-05-01 10:00 UTC), datetime!(2030-05-01 11:00 UTC));
        let existing = [own.clone(), cancelled];

        let mut moving = request(
            datetime!(2030-05-01 10:30 UTC),
            datetime!(2030-05-01 11:30 UTC),
            Role::Admin,
            &profile,
            &[],
            &existing,
        );
        assert!(resolver.evaluate(&moving).is_err());
        moving.exclude_appointment_id = Some(own.id);
        assert!(resolver.evaluate(&moving).is_ok());

        moving.start = datetime!(2030-05-01 13:00 UTC);
        moving.end = datetime!(2030-05-01 14:00 UTC);
        assert!(resolver.evaluate(&moving).is_ok());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(Duration::minutes(15)), "15 minutes");
        assert_eq!(describe(Duration::hours(1)), "1 hour");
        assert_eq!(describe(Duration::minutes(90)), "90 minutes");
    }
}
