use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ephra_core::Clock;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::error::NotificationError;
use crate::memory::InMemoryReminderQueue;
use crate::types::ScheduledReminder;

/// Final delivery step for a due reminder.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, reminder: &ScheduledReminder) -> Result<(), NotificationError>;
}

/// Sink that only logs. Used when no email provider is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ReminderSink for TracingSink {
    async fn deliver(&self, reminder: &ScheduledReminder) -> Result<(), NotificationError> {
        info!(
            message_id = %reminder.message_id,
            appointment_id = %reminder.request.appointment_id,
            user_id = %reminder.request.user_id,
            starts_at = %reminder.request.appointment_start,
            "Appointment reminder due"
        );
        Ok(())
    }
}

/// Drains due reminders from the queue into a sink
pub struct ReminderDispatcher<S: ReminderSink> {
    queue: Arc<InMemoryReminderQueue>,
    sink: S,
    clock: Arc<dyn Clock>,
}

impl<S: ReminderSink> ReminderDispatcher<S> {
    pub fn new(queue: Arc<InMemoryReminderQueue>, sink: S, clock: Arc<dyn Clock>) -> Self {
        Self { queue, sink, clock }
    }

    /// Start dispatch loop
    pub async fn run(&self, poll_interval: Duration) {
        let mut ticker = interval(poll_interval);

        info!("Reminder dispatcher started");

        loop {
            ticker.tick().await;

            match self.dispatch_due().await {
                Ok(0) => {}
                Ok(sent) => info!(count = sent, "Dispatched reminders"),
                Err(e) => error!(error = %e, "Error dispatching reminders"),
            }
        }
    }

    /// Deliver every reminder that is due now. Failed deliveries are
    /// logged and dropped.
    pub async fn dispatch_due(&self) -> Result<u32, NotificationError> {
        let due = self.queue.take_due(self.clock.now()).await;
        let mut sent = 0;

        for reminder in due {
            match self.sink.deliver(&reminder).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(
                    message_id = %reminder.message_id,
                    error = %e,
                    "Reminder delivery failed"
                ),
            }
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ReminderService;
    use crate::types::ReminderRequest;
    use ephra_core::FixedClock;
    use std::sync::Mutex;
    use time::macros::datetime;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReminderSink for Arc<RecordingSink> {
        async fn deliver(&self, reminder: &ScheduledReminder) -> Result<(), NotificationError> {
            if reminder.request.user_id == "bounce" {
                return Err(NotificationError::SendFailed("mailbox full".into()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push(reminder.request.appointment_id.clone());
            Ok(())
        }
    }

    fn request(appointment_id: &str, user_id: &str) -> ReminderRequest {
        ReminderRequest {
            appointment_id: appointment_id.into(),
            user_id: user_id.into(),
            care_provider_id: "prov-1".into(),
            appointment_start: datetime!(2030-05-01 10:00 UTC),
            deliver_at: datetime!(2030-05-01 09:45 UTC),
            meeting_link: Some("https://meet.jit.si/x".into()),
        }
    }

    #[tokio::test]
    async fn test_dispatch_due_skips_failures() {
        let clock = Arc::new(FixedClock::new(datetime!(2030-05-01 08:00 UTC)));
        let queue = Arc::new(InMemoryReminderQueue::new(clock.clone()));
        queue.schedule_reminder(&request("a", "user-1")).await.unwrap();
        queue.schedule_reminder(&request("b", "bounce")).await.unwrap();

        let sink = Arc::new(RecordingSink::default());
        let dispatcher = ReminderDispatcher::new(queue.clone(), sink.clone(), clock.clone());

        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 0);

        clock.set(datetime!(2030-05-01 09:46 UTC));
        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 1);
        assert_eq!(*sink.delivered.lock().unwrap(), vec!["a".to_string()]);
        assert!(queue.is_empty().await);
        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts() {
        let clock = Arc::new(FixedClock::new(datetime!(2030-05-01 09:50 UTC)));
        let queue = Arc::new(InMemoryReminderQueue::new(clock.clone()));
        let dispatcher = ReminderDispatcher::new(queue, TracingSink, clock);
        assert_eq!(dispatcher.dispatch_due().await.unwrap(), 0);
    }
}
