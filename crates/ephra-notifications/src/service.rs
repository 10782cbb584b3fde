use async_trait::async_trait;

use crate::error::NotificationError;
use crate::types::ReminderRequest;

/// Schedules and cancels appointment reminder emails.
///
/// Callers treat every failure as non-fatal.
#[async_trait]
pub trait ReminderService: Send + Sync {
    /// Schedule a reminder for `request.deliver_at`.
    ///
    /// Returns the provider's message id, or `None` when nothing was
    /// scheduled (e.g. the delivery time has already passed).
    async fn schedule_reminder(
        &self,
        request: &ReminderRequest,
    ) -> Result<Option<String>, NotificationError>;

    /// Cancel a previously scheduled reminder. `false` if it was unknown
    /// or already sent.
    async fn cancel_reminder(&self, message_id: &str) -> Result<bool, NotificationError>;
}
