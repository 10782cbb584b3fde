//! Appointment, availability and provider records.

use std::fmt;

use ephra_core::{ServiceError, TimeRange};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Appointment status.
///
/// ```text
/// Pending --confirm--> Confirmed
/// Pending | Confirmed --cancel--> Cancelled
/// Pending | Confirmed --complete--> Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Active appointments occupy their provider's time.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn confirm(self) -> Result<Self, ServiceError> {
        match self {
            Self::Pending => Ok(Self::Confirmed),
            Self::Confirmed => Err(ServiceError::business_rule(
                "Appointment is already confirmed",
            )),
            Self::Cancelled | Self::Completed => Err(ServiceError::business_rule(format!(
                "Cannot confirm a {self} appointment"
            ))),
        }
    }

    pub fn cancel(self) -> Result<Self, ServiceError> {
        match self {
            Self::Pending | Self::Confirmed => Ok(Self::Cancelled),
            Self::Cancelled => Err(ServiceError::business_rule(
                "Appointment is already cancelled",
            )),
            Self::Completed => Err(ServiceError::business_rule(
                "Cannot cancel a completed appointment",
            )),
        }
    }

    pub fn complete(self) -> Result<Self, ServiceError> {
        match self {
            Self::Pending | Self::Confirmed => Ok(Self::Completed),
            Self::Completed => Err(ServiceError::business_rule(
                "Appointment is already completed",
            )),
            Self::Cancelled => Err(ServiceError::business_rule(
                "Cannot complete a cancelled appointment",
            )),
        }
    }

    /// Applies a requested status change through the state machine.
    /// Requesting the current non-terminal status is a no-op.
    pub fn transition_to(self, target: AppointmentStatus) -> Result<Self, ServiceError> {
        if self == target && self.is_active() {
            return Ok(self);
        }
        match target {
            Self::Confirmed => self.confirm(),
            Self::Cancelled => self.cancel(),
            Self::Completed => self.complete(),
            Self::Pending => Err(ServiceError::business_rule(format!(
                "Cannot move a {self} appointment back to pending"
            ))),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Email reminder bookkeeping for an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTracking {
    pub email_message_id: Option<String>,
    pub scheduled: bool,
    pub delivered: bool,
    pub opened: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub care_provider_id: String,
    pub time_range: TimeRange,
    pub status: AppointmentStatus,

    /// Minutes before the start at which the reminder goes out
    pub reminder_minutes: u32,

    pub meeting_link: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    pub reminder: ReminderTracking,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True when `subject_id` is the booked user or the provider.
    pub fn involves(&self, subject_id: &str) -> bool {
        self.user_id == subject_id || self.care_provider_id == subject_id
    }

    pub fn reminder_at(&self) -> OffsetDateTime {
        self.time_range.start() - Duration::minutes(i64::from(self.reminder_minutes))
    }
}

/// A provider-declared window of bookable time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub provider_id: String,
    pub time_range: TimeRange,
    pub is_available: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AvailabilitySlot {
    /// Whether this slot admits a booking for `range`.
    pub fn covers(&self, range: &TimeRange) -> bool {
        self.is_available && self.time_range.contains(range)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub is_accepting_patients: bool,
    pub is_active: bool,
}

impl ProviderProfile {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            is_accepting_patients: true,
            is_active: true,
        }
    }

    pub fn not_accepting(mut self) -> Self {
        self.is_accepting_patients = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephra_core::ErrorKind;
    use AppointmentStatus::*;

    #[test]
    fn test_state_machine() {
        assert_eq!(Pending.confirm().unwrap(), Confirmed);
        assert_eq!(Pending.cancel().unwrap(), Cancelled);
        assert_eq!(Confirmed.cancel().unwrap(), Cancelled);
        assert_eq!(Confirmed.complete().unwrap(), Completed);

        for status in [Cancelled, Completed] {
            assert!(status.is_terminal());
            assert_eq!(status.confirm().unwrap_err().kind(), ErrorKind::BusinessRule);
            assert_eq!(status.cancel().unwrap_err().kind(), ErrorKind::BusinessRule);
            assert_eq!(status.complete().unwrap_err().kind(), ErrorKind::BusinessRule);
        }
    }

    #[test]
    fn test_cancel_messages() {
        assert_eq!(
            Cancelled.cancel().unwrap_err(),
            ServiceError::business_rule("Appointment is already cancelled")
        );
        assert_eq!(
            Completed.cancel().unwrap_err(),
            ServiceError::business_rule("Cannot cancel a completed appointment")
        );
    }

    #[test]
    fn test_transition_to() {
        assert_eq!(Pending.transition_to(Pending).unwrap(), Pending);
        assert_eq!(Confirmed.transition_to(Confirmed).unwrap(), Confirmed);
        assert_eq!(Pending.transition_to(Completed).unwrap(), Completed);
        assert!(Confirmed.transition_to(Pending).is_err());
        assert!(Cancelled.transition_to(Cancelled).is_err());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&Confirmed).unwrap(), "\"confirmed\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, Completed);
    }
}
