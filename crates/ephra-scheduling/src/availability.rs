//! Provider availability slots.

use std::sync::Arc;

use ephra_auth::{Principal, permission, scopes};
use ephra_core::{Clock, ServiceError, TimeRange};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::lock::ProviderLocks;
use crate::models::{Appointment, AvailabilitySlot};
use crate::store::SchedulingStores;

/// Body of a slot creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSlot {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,

    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Partial slot update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotUpdate {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,

    pub is_available: Option<bool>,
}

/// Slot CRUD under the provider's schedule lock.
pub struct AvailabilityManager {
    stores: SchedulingStores,
    locks: Arc<ProviderLocks>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityManager {
    pub fn new(stores: SchedulingStores, locks: Arc<ProviderLocks>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            locks,
            clock,
        }
    }

    pub async fn list_slots(&self, provider_id: &str) -> Result<Vec<AvailabilitySlot>, ServiceError> {
        self.stores.availability.list_slots(provider_id).await
    }

    pub async fn create_slot(
        &self,
        principal: &Principal,
        provider_id: &str,
        new_slot: NewSlot,
    ) -> Result<AvailabilitySlot, ServiceError> {
        authorize(principal, provider_id)?;
        let range = slot_range(new_slot.start_time, new_slot.end_time)?;

        if self.stores.directory.provider_profile(provider_id).await?.is_none() {
            return Err(ServiceError::not_found("Care provider profile", provider_id));
        }

        let _guard = self.locks.acquire(provider_id).await?;

        let existing = self.stores.availability.list_slots(provider_id).await?;
        ensure_no_slot_overlap(&existing, &range, None)?;

        let now = self.clock.now();
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            provider_id: provider_id.to_string(),
            time_range: range,
            is_available: new_slot.is_available,
            created_at: now,
            updated_at: now,
        };
        self.stores.availability.save_slot(&slot).await?;

        info!(provider_id, slot_id = %slot.id, range = %slot.time_range, "Availability slot created");
        Ok(slot)
    }

    pub async fn update_slot(
        &self,
        principal: &Principal,
        slot_id: Uuid,
        update: SlotUpdate,
    ) -> Result<AvailabilitySlot, ServiceError> {
        let provider_id = self.load_slot(slot_id).await?.provider_id;
        authorize(principal, &provider_id)?;

        let _guard = self.locks.acquire(&provider_id).await?;
        let mut slot = self.load_slot(slot_id).await?;

        let range = slot_range(
            update.start_time.unwrap_or(slot.time_range.start()),
            update.end_time.unwrap_or(slot.time_range.end()),
        )?;
        let is_available = update.is_available.unwrap_or(slot.is_available);

        let others = self.stores.availability.list_slots(&provider_id).await?;
        ensure_no_slot_overlap(&others, &range, Some(slot.id))?;

        // Appointments booked inside the old window must stay covered.
        let appointments = self
            .stores
            .appointments
            .list_active_for_provider(&provider_id)
            .await?;
        let stranded = appointments.iter().any(|a| {
            slot.time_range.contains(&a.time_range)
                && !(is_available && range.contains(&a.time_range))
        });
        if stranded {
            return Err(ServiceError::business_rule(
                "Cannot change availability slot: scheduled appointments would no longer be covered",
            ));
        }

        slot.time_range = range;
        slot.is_available = is_available;
        slot.updated_at = self.clock.now();
        self.stores.availability.save_slot(&slot).await?;

        info!(provider_id = %provider_id, slot_id = %slot.id, range = %slot.time_range, "Availability slot updated");
        Ok(slot)
    }

    pub async fn delete_slot(&self, principal: &Principal, slot_id: Uuid) -> Result<(), ServiceError> {
        let provider_id = self.load_slot(slot_id).await?.provider_id;
        authorize(principal, &provider_id)?;

        let _guard = self.locks.acquire(&provider_id).await?;
        let slot = self.load_slot(slot_id).await?;

        let appointments = self
            .stores
            .appointments
            .list_active_for_provider(&provider_id)
            .await?;
        if has_overlapping(&appointments, &slot.time_range) {
            return Err(ServiceError::business_rule(
                "Cannot delete availability slot with scheduled appointments",
            ));
        }

        self.stores.availability.delete_slot(slot.id).await?;
        info!(provider_id = %provider_id, slot_id = %slot.id, "Availability slot deleted");
        Ok(())
    }

    async fn load_slot(&self, slot_id: Uuid) -> Result<AvailabilitySlot, ServiceError> {
        self.stores
            .availability
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Availability slot", slot_id.to_string()))
    }
}

fn authorize(principal: &Principal, provider_id: &str) -> Result<(), ServiceError> {
    permission::require_scope(principal, scopes::MANAGE_AVAILABILITY)?;
    if principal.is_self(provider_id) || principal.has_scope(scopes::MANAGE_ALL_USERS) {
        Ok(())
    } else {
        Err(ServiceError::forbidden("You can only manage your own availability"))
    }
}

fn slot_range(start: OffsetDateTime, end: OffsetDateTime) -> Result<TimeRange, ServiceError> {
    TimeRange::new(start, end)
        .map_err(|_| ServiceError::validation("Start time must be before end time"))
}

fn ensure_no_slot_overlap(
    slots: &[AvailabilitySlot],
    range: &TimeRange,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let overlaps = slots
        .iter()
        .filter(|s| Some(s.id) != exclude)
        .any(|s| s.time_range.overlaps(range));
    if overlaps {
        Err(ServiceError::conflict(
            "This time slot overlaps with an existing availability slot",
        ))
    } else {
        Ok(())
    }
}

fn has_overlapping(appointments: &[Appointment], range: &TimeRange) -> bool {
    appointments
        .iter()
        .any(|a| a.is_active() && a.time_range.overlaps(range))
}
