//! Appointment scheduling for the Ephra booking core.
//!
//! - [`resolver`]: pure accept/reject decisions for a proposed range
//! - [`lifecycle`]: booking, rescheduling and status changes
//! - [`availability`]: provider-declared bookable windows
//! - [`store`]: persistence traits the scheduler depends on

pub mod availability;
pub mod config;
pub mod lifecycle;
pub mod lock;
pub mod models;
pub mod resolver;
pub mod store;
pub mod suggest;

pub use availability::{AvailabilityManager, NewSlot, SlotUpdate};
pub use config::SchedulingConfig;
pub use lifecycle::{AppointmentLifecycle, AppointmentPatch, CreateAppointment, Page};
pub use lock::ProviderLocks;
pub use models::{
    Appointment, AppointmentStatus, AvailabilitySlot, ProviderProfile, ReminderTracking,
};
pub use resolver::{ScheduleRequest, SchedulingResolver};
pub use store::{
    AppointmentFilter, AppointmentStore, AssignmentStore, AvailabilityStore, DirectoryStore,
    SchedulingStores,
};
