use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ephra_core::Clock;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::service::ReminderService;
use crate::types::{ReminderRequest, ReminderStatus, ScheduledReminder};

/// In-process reminder queue.
///
/// Holds only pending reminders: taking or cancelling one removes it.
/// Reminders whose delivery time has already passed are skipped rather
/// than sent late.
pub struct InMemoryReminderQueue {
    reminders: RwLock<HashMap<String, ScheduledReminder>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryReminderQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            reminders: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn get(&self, message_id: &str) -> Option<ScheduledReminder> {
        self.reminders.read().await.get(message_id).cloned()
    }

    /// Scheduled reminders for one appointment
    pub async fn pending_for(&self, appointment_id: &str) -> Vec<ScheduledReminder> {
        self.reminders
            .read()
            .await
            .values()
            .filter(|r| r.request.appointment_id == appointment_id)
            .cloned()
            .collect()
    }

    /// Number of reminders still waiting for delivery
    pub async fn len(&self) -> usize {
        self.reminders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reminders.read().await.is_empty()
    }

    /// Removes due reminders from the schedule and returns them marked
    /// sent, ordered by delivery time.
    pub async fn take_due(&self, now: OffsetDateTime) -> Vec<ScheduledReminder> {
        let mut reminders = self.reminders.write().await;
        let due_ids: Vec<String> = reminders
            .values()
            .filter(|r| r.request.deliver_at <= now)
            .map(|r| r.message_id.clone())
            .collect();

        let mut due: Vec<ScheduledReminder> = due_ids
            .iter()
            .filter_map(|id| reminders.remove(id))
            .map(|mut r| {
                r.status = ReminderStatus::Sent;
                r
            })
            .collect();
        due.sort_by_key(|r| r.request.deliver_at);
        due
    }
}

#[async_trait]
impl ReminderService for InMemoryReminderQueue {
    async fn schedule_reminder(
        &self,
        request: &ReminderRequest,
    ) -> Result<Option<String>, NotificationError> {
        let now = self.clock.now();
        if request.deliver_at <= now {
            warn!(
                appointment_id = %request.appointment_id,
                deliver_at = %request.deliver_at,
                "Reminder time already passed, not scheduling"
            );
            return Ok(None);
        }

        let message_id = uuid::Uuid::new_v4().to_string();
        let reminder = ScheduledReminder {
            message_id: message_id.clone(),
            request: request.clone(),
            status: ReminderStatus::Scheduled,
            created_at: now,
        };
        self.reminders
            .write()
            .await
            .insert(message_id.clone(), reminder);

        debug!(
            appointment_id = %request.appointment_id,
            message_id = %message_id,
            "Reminder scheduled"
        );
        Ok(Some(message_id))
    }

    async fn cancel_reminder(&self, message_id: &str) -> Result<bool, NotificationError> {
        // Only pending reminders are stored, so a miss means sent or unknown.
        if self.reminders.write().await.remove(message_id).is_some() {
            debug!(message_id, "Reminder cancelled");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephra_core::FixedClock;
    use time::macros::datetime;

    fn request(deliver_at: OffsetDateTime) -> ReminderRequest {
        ReminderRequest {
            appointment_id: "appt-1".into(),
            user_id: "user-1".into(),
            care_provider_id: "prov-1".into(),
            appointment_start: deliver_at + time::Duration::minutes(15),
            deliver_at,
            meeting_link: None,
        }
    }

    fn queue() -> InMemoryReminderQueue {
        InMemoryReminderQueue::new(Arc::new(FixedClock::new(datetime!(2030-05-01 08:00 UTC))))
    }

    #[tokio::test]
    async fn test_schedule_and_cancel() {
        let queue = queue();
        let id = queue
            .schedule_reminder(&request(datetime!(2030-05-01 09:45 UTC)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queue.pending_for("appt-1").await.len(), 1);

        assert!(queue.cancel_reminder(&id).await.unwrap());
        assert!(!queue.cancel_reminder(&id).await.unwrap());
        assert!(queue.get(&id).await.is_none());
        assert!(queue.pending_for("appt-1").await.is_empty());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_past_delivery_time_is_skipped() {
        let queue = queue();
        let id = queue
            .schedule_reminder(&request(datetime!(2030-05-01 07:59 UTC)))
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_take_due() {
        let queue = queue();
        let early = queue
            .schedule_reminder(&request(datetime!(2030-05-01 09:00 UTC)))
            .await
            .unwrap()
            .unwrap();
        queue
            .schedule_reminder(&request(datetime!(2030-05-01 12:00 UTC)))
            .await
            .unwrap();

        let due = queue.take_due(datetime!(2030-05-01 10:00 UTC)).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message_id, early);
        assert_eq!(due[0].status, ReminderStatus::Sent);
        assert_eq!(queue.len().await, 1);

        // Sent reminders are neither re-sent nor cancellable.
        assert!(queue.take_due(datetime!(2030-05-01 10:00 UTC)).await.is_empty());
        assert!(!queue.cancel_reminder(&early).await.unwrap());
    }

    #[tokio::test]
    async fn test_taken_and_cancelled_reminders_are_released() {
        let queue = queue();
        let base = datetime!(2030-05-01 09:00 UTC);
        let mut ids = Vec::new();
        for i in 0..100 {
            let deliver_at = base + time::Duration::minutes(i);
            ids.push(queue.schedule_reminder(&request(deliver_at)).await.unwrap().unwrap());
        }
        assert_eq!(queue.len().await, 100);

        for id in ids.iter().skip(50) {
            assert!(queue.cancel_reminder(id).await.unwrap());
        }
        assert_eq!(queue.len().await, 50);

        let due = queue.take_due(datetime!(2030-05-01 09:30 UTC)).await;
        assert_eq!(due.len(), 31);
        assert_eq!(queue.len().await, 19);

        let rest = queue.take_due(datetime!(2030-05-01 23:00 UTC)).await;
        assert_eq!(rest.len(), 19);
        assert!(queue.is_empty().await);
    }
}
