//! Persistence seams used by the scheduler.
//!
//! Implementations must be thread-safe. A missing record is `Ok(None)`;
//! errors are reserved for infrastructure failures and should be reported
//! as [`ServiceError::Storage`].

use std::sync::Arc;

use async_trait::async_trait;
use ephra_core::ServiceError;
use uuid::Uuid;

use crate::models::{Appointment, AvailabilitySlot, ProviderProfile};

/// Which appointments a listing should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentFilter {
    All,
    User(String),
    Provider(String),
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        match self {
            Self::All => true,
            Self::User(id) => appointment.user_id == *id,
            Self::Provider(id) => appointment.care_provider_id == *id,
        }
    }
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, ServiceError>;

    /// Pending and confirmed appointments of one provider.
    async fn list_active_for_provider(
        &self,
        provider_id: &str,
    ) -> Result<Vec<Appointment>, ServiceError>;

    /// Appointments matching `filter`, ordered by start time.
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, ServiceError>;

    /// Inserts or replaces by id. Appointments are never hard-deleted.
    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn get_slot(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, ServiceError>;

    /// Slots of one provider, ordered by start time.
    async fn list_slots(&self, provider_id: &str) -> Result<Vec<AvailabilitySlot>, ServiceError>;

    async fn save_slot(&self, slot: &AvailabilitySlot) -> Result<(), ServiceError>;

    /// Returns `false` if the slot did not exist.
    async fn delete_slot(&self, id: Uuid) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Whether `user_id` is assigned to `provider_id`.
    async fn is_assigned(&self, user_id: &str, provider_id: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn is_active_user(&self, user_id: &str) -> Result<bool, ServiceError>;

    async fn provider_profile(
        &self,
        provider_id: &str,
    ) -> Result<Option<ProviderProfile>, ServiceError>;
}

/// The stores the scheduler reads and writes.
#[derive(Clone)]
pub struct SchedulingStores {
    pub appointments: Arc<dyn AppointmentStore>,
    pub availability: Arc<dyn AvailabilityStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub directory: Arc<dyn DirectoryStore>,
}

impl SchedulingStores {
    /// Uses one backend for every store.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: AppointmentStore + AvailabilityStore + AssignmentStore + DirectoryStore + 'static,
    {
        Self {
            appointments: backend.clone(),
            availability: backend.clone(),
            assignments: backend.clone(),
            directory: backend,
        }
    }
}
