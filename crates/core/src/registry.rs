use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult, ConflictKind};
use crate::models::{
    principal::{Principal, Role},
    slot::{CreateSlotRequest, Slot, SlotFilter, UpdateSlotRequest},
};
use crate::store::{SlotRemoval, SlotUpdate, StoreHandle};

/// Creation, editing and removal of slots.
///
/// The registry never touches `booked_count`; that belongs to the booking
/// engine. Edits that interact with it (lowering capacity, deleting) are
/// decided atomically by the store.
#[derive(Clone)]
pub struct SlotRegistry {
    store: StoreHandle,
}

impl SlotRegistry {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn create_slot(
        &self,
        principal: &Principal,
        request: CreateSlotRequest,
    ) -> BookingResult<Slot> {
        if principal.role != Role::Lecturer {
            return Err(BookingError::Authorization(
                "Only lecturers can create slots".to_string(),
            ));
        }
        let details = request.validate()?;
        let slot = Slot::new(principal.id, details);

        let slot = self
            .store
            .bounded("insert_slot", self.store.get().insert_slot(&slot))
            .await?;
        info!(slot_id = %slot.id, owner_id = %slot.owner_id, date = %slot.date, "Slot created");
        Ok(slot)
    }

    pub async fn update_slot_details(
        &self,
        slot_id: Uuid,
        principal: &Principal,
        request: UpdateSlotRequest,
    ) -> BookingResult<Slot> {
        let slot = self.get_slot(slot_id).await?;
        ensure_owner(&slot, principal, "update")?;
        let merged = request.validate()?.apply(&slot)?;

        match self
            .store
            .bounded("update_slot", self.store.get().update_slot(&merged))
            .await?
        {
            SlotUpdate::Updated(updated) => {
                info!(slot_id = %updated.id, "Slot updated");
                Ok(updated)
            }
            SlotUpdate::Missing => Err(slot_not_found(slot_id)),
            SlotUpdate::CapacityBelowBookings { booked } => Err(BookingError::Conflict(
                ConflictKind::CapacityBelowBookings {
                    booked,
                    requested: merged.capacity,
                },
            )),
        }
    }

    pub async fn delete_slot(&self, slot_id: Uuid, principal: &Principal) -> BookingResult<()> {
        let slot = self.get_slot(slot_id).await?;
        ensure_owner(&slot, principal, "delete")?;

        match self
            .store
            .bounded("delete_slot", self.store.get().delete_slot(slot_id))
            .await?
        {
            SlotRemoval::Removed => {
                info!(%slot_id, "Slot deleted");
                Ok(())
            }
            SlotRemoval::Missing => Err(slot_not_found(slot_id)),
            SlotRemoval::HasBookings { booked } => {
                debug!(%slot_id, booked, "Refusing to delete booked slot");
                Err(BookingError::Conflict(ConflictKind::SlotHasBookings { booked }))
            }
        }
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> BookingResult<Slot> {
        self.store
            .bounded("get_slot", self.store.get().get_slot(slot_id))
            .await?
            .ok_or_else(|| slot_not_found(slot_id))
    }

    pub async fn list_slots(&self, filter: &SlotFilter) -> BookingResult<Vec<Slot>> {
        self.store
            .bounded("list_slots", self.store.get().list_slots(filter))
            .await
    }
}

fn ensure_owner(slot: &Slot, principal: &Principal, action: &str) -> BookingResult<()> {
    if slot.owner_id != principal.id {
        return Err(BookingError::Authorization(format!(
            "Only the owning lecturer can {action} slot {}",
            slot.id
        )));
    }
    Ok(())
}

pub(crate) fn slot_not_found(slot_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Slot with ID {slot_id} not found"))
}
