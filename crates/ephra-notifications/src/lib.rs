pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod service;
pub mod types;
pub mod webhook;

pub use dispatcher::{ReminderDispatcher, ReminderSink, TracingSink};
pub use error::NotificationError;
pub use memory::InMemoryReminderQueue;
pub use service::ReminderService;
pub use types::*;
pub use webhook::WebhookVerifier;
