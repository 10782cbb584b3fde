use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ephra_core::ServiceError;
use ephra_scheduling::{
    Appointment, AppointmentFilter, AppointmentStore, AssignmentStore, AvailabilitySlot,
    AvailabilityStore, DirectoryStore, ProviderProfile,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::seed::SeedData;

/// In-memory backend for appointments, slots, assignments and the
/// user/provider directory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    slots: RwLock<HashMap<Uuid, AvailabilitySlot>>,
    /// (user_id, provider_id)
    assignments: RwLock<HashSet<(String, String)>>,
    active_users: RwLock<HashSet<String>>,
    providers: RwLock<HashMap<String, ProviderProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with `seed`.
    pub async fn with_seed(seed: &SeedData) -> Self {
        let store = Self::new();
        for user in &seed.users {
            store.add_user(user).await;
        }
        for profile in &seed.providers {
            store.add_provider(profile.clone()).await;
        }
        for a in &seed.assignments {
            store.assign(&a.user_id, &a.provider_id).await;
        }
        debug!(
            users = seed.users.len(),
            providers = seed.providers.len(),
            assignments = seed.assignments.len(),
            "Seeded in-memory store"
        );
        store
    }

    pub async fn add_user(&self, user_id: &str) {
        self.active_users.write().await.insert(user_id.to_string());
    }

    pub async fn deactivate_user(&self, user_id: &str) -> bool {
        self.active_users.write().await.remove(user_id)
    }

    pub async fn add_provider(&self, profile: ProviderProfile) {
        self.providers
            .write()
            .await
            .insert(profile.provider_id.clone(), profile);
    }

    pub async fn assign(&self, user_id: &str, provider_id: &str) {
        self.assignments
            .write()
            .await
            .insert((user_id.to_string(), provider_id.to_string()));
    }

    pub async fn unassign(&self, user_id: &str, provider_id: &str) -> bool {
        self.assignments
            .write()
            .await
            .remove(&(user_id.to_string(), provider_id.to_string()))
    }

    pub async fn appointment_count(&self) -> usize {
        self.appointments.read().await.len()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, ServiceError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list_active_for_provider(
        &self,
        provider_id: &str,
    ) -> Result<Vec<Appointment>, ServiceError> {
        let filter = AppointmentFilter::Provider(provider_id.to_string());
        let mut active: Vec<Appointment> = self
            .list_appointments(&filter)
            .await?
            .into_iter()
            .filter(Appointment::is_active)
            .collect();
        active.sort_by_key(|a| a.time_range.start());
        Ok(active)
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, ServiceError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.time_range.start());
        Ok(matching)
    }

    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), ServiceError> {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryStore {
    async fn get_slot(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, ServiceError> {
        Ok(self.slots.read().await.get(&id).cloned())
    }

    async fn list_slots(&self, provider_id: &str) -> Result<Vec<AvailabilitySlot>, ServiceError> {
        let mut slots: Vec<AvailabilitySlot> = self
            .slots
            .read()
            .await
            .values()
            .filter(|s| s.provider_id == provider_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.time_range.start());
        Ok(slots)
    }

    async fn save_slot(&self, slot: &AvailabilitySlot) -> Result<(), ServiceError> {
        self.slots.write().await.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn delete_slot(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.slots.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl AssignmentStore for InMemoryStore {
    async fn is_assigned(&self, user_id: &str, provider_id: &str) -> Result<bool, ServiceError> {
        Ok(self
            .assignments
            .read()
            .await
            .contains(&(user_id.to_string(), provider_id.to_string())))
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn is_active_user(&self, user_id: &str) -> Result<bool, ServiceError> {
        Ok(self.active_users.read().await.contains(user_id))
    }

    async fn provider_profile(
        &self,
        provider_id: &str,
    ) -> Result<Option<ProviderProfile>, ServiceError> {
        Ok(self.providers.read().await.get(provider_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::AssignmentSeed;
    use ephra_core::TimeRange;
    use ephra_scheduling::{AppointmentStatus, ReminderTracking};
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn appointment(provider: &str, start: OffsetDateTime, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            care_provider_id: provider.into(),
            time_range: TimeRange::starting_at(start, time::Duration::hours(1)).unwrap(),
            status,
            reminder_minutes: 15,
            meeting_link: None,
            notes: None,
            reminder: ReminderTracking::default(),
            created_at: start,
            updated_at: start,
        }
    }

    #[tokio::test]
    async fn test_active_listing_is_sorted_and_filtered() {
        let store = InMemoryStore::new();
        let late = appointment("prov-1", datetime!(2030-05-01 15:00 UTC), AppointmentStatus::Pending);
        let early = appointment("prov-1", datetime!(2030-05-01 09:00 UTC), AppointmentStatus::Confirmed);
        let cancelled = appointment("prov-1", datetime!(2030-05-01 11:00 UTC), AppointmentStatus::Cancelled);
        let other = appointment("prov-2", datetime!(2030-05-01 10:00 UTC), AppointmentStatus::Pending);
        for a in [&late, &early, &cancelled, &other] {
            store.save_appointment(a).await.unwrap();
        }

        let active = store.list_active_for_provider("prov-1").await.unwrap();
        let ids: Vec<Uuid> = active.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);

        let all = store.list_appointments(&AppointmentFilter::All).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(store.appointment_count().await, 4);
    }

    #[tokio::test]
    async fn test_seeded_directory() {
        let seed = SeedData {
            users: vec!["user-1".into()],
            providers: vec![ProviderProfile::new("prov-1")],
            assignments: vec![AssignmentSeed {
                user_id: "user-1".into(),
                provider_id: "prov-1".into(),
            }],
        };
        let store = InMemoryStore::with_seed(&seed).await;

        assert!(store.is_active_user("user-1").await.unwrap());
        assert!(store.is_assigned("user-1", "prov-1").await.unwrap());
        assert!(!store.is_assigned("user-1", "prov-2").await.unwrap());
        assert!(store.provider_profile("prov-1").await.unwrap().is_some());

        assert!(store.deactivate_user("user-1").await);
        assert!(!store.is_active_user("user-1").await.unwrap());
        assert!(store.unassign("user-1", "prov-1").await);
    }
}
