use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::NotificationError;

/// A request to remind the participants of an upcoming appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub appointment_id: String,
    pub user_id: String,
    pub care_provider_id: String,

    #[serde(with = "time::serde::rfc3339")]
    pub appointment_start: OffsetDateTime,

    /// When the reminder should go out
    #[serde(with = "time::serde::rfc3339")]
    pub deliver_at: OffsetDateTime,

    pub meeting_link: Option<String>,
}

/// Reminder status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Scheduled,
    Sent,
}

/// A reminder accepted by a [`crate::ReminderService`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub message_id: String,
    pub request: ReminderRequest,
    pub status: ReminderStatus,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Delivery callbacks reported by the email provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEvent {
    Delivered,
    Opened,
}

impl DeliveryEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Opened => "opened",
        }
    }
}

impl fmt::Display for DeliveryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryEvent {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivered" => Ok(Self::Delivered),
            "opened" => Ok(Self::Opened),
            other => Err(NotificationError::InvalidRequest(format!(
                "unknown delivery event: {other}"
            ))),
        }
    }
}
