//! In-process [`BookingStore`] used by tests and the `memory` storage backend.
//!
//! Each operation runs under a single async mutex, which makes it atomic with
//! respect to every other operation on the same store. The engine does not rely
//! on this lock; it is simply how this backend honours the port's contract.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use eyre::{Result, eyre};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookingStore, Relocation, Reservation, SlotRemoval, SlotUpdate, StatusChange, Transition};
use crate::models::{
    appointment::{Appointment, AppointmentFilter, AppointmentStatus},
    slot::{Slot, SlotFilter},
};

#[derive(Debug, Default)]
struct State {
    slots: HashMap<Uuid, Slot>,
    appointments: HashMap<Uuid, Appointment>,
}

impl State {
    fn holds_active(&self, slot_id: Uuid, student_id: Uuid) -> bool {
        self.appointments.values().any(|a| {
            a.slot_id == slot_id && a.student_id == student_id && a.status.is_active()
        })
    }

    fn release(&mut self, slot_id: Uuid) {
        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.booked_count = slot.booked_count.saturating_sub(1);
            slot.updated_at = Utc::now();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_slot(&self, slot: &Slot) -> Result<Slot> {
        let mut state = self.state.lock().await;
        if state.slots.contains_key(&slot.id) {
            return Err(eyre!("slot {} already exists", slot.id));
        }
        state.slots.insert(slot.id, slot.clone());
        Ok(slot.clone())
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<Slot>> {
        Ok(self.state.lock().await.slots.get(&id).cloned())
    }

    async fn list_slots(&self, filter: &SlotFilter) -> Result<Vec<Slot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|slot| filter.matches(slot))
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.date, slot.start_time, slot.id));
        Ok(slots)
    }

    async fn update_slot(&self, slot: &Slot) -> Result<SlotUpdate> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.slots.get_mut(&slot.id) else {
            return Ok(SlotUpdate::Missing);
        };
        if slot.capacity < stored.booked_count {
            return Ok(SlotUpdate::CapacityBelowBookings {
                booked: stored.booked_count,
            });
        }

        stored.location = slot.location.clone();
        stored.date = slot.date;
        stored.start_time = slot.start_time;
        stored.end_time = slot.end_time;
        stored.capacity = slot.capacity;
        stored.updated_at = slot.updated_at;
        Ok(SlotUpdate::Updated(stored.clone()))
    }

    async fn delete_slot(&self, id: Uuid) -> Result<SlotRemoval> {
        let mut state = self.state.lock().await;
        match state.slots.get(&id) {
            None => Ok(SlotRemoval::Missing),
            Some(slot) if slot.booked_count > 0 => Ok(SlotRemoval::HasBookings {
                booked: slot.booked_count,
            }),
            Some(_) => {
                state.slots.remove(&id);
                Ok(SlotRemoval::Removed)
            }
        }
    }

    async fn reserve(&self, appointment: &Appointment) -> Result<Reservation> {
        let mut state = self.state.lock().await;
        let is_full = match state.slots.get(&appointment.slot_id) {
            None => return Ok(Reservation::SlotMissing),
            Some(slot) => slot.is_full(),
        };
        if state.holds_active(appointment.slot_id, appointment.student_id) {
            return Ok(Reservation::AlreadyBooked);
        }
        if is_full {
            return Ok(Reservation::SlotFull);
        }

        if let Some(slot) = state.slots.get_mut(&appointment.slot_id) {
            slot.booked_count += 1;
            slot.updated_at = Utc::now();
        }
        state
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(Reservation::Reserved(appointment.clone()))
    }

    async fn transition(&self, change: &StatusChange) -> Result<Transition> {
        let mut state = self.state.lock().await;
        let Some(appointment) = state.appointments.get_mut(&change.id) else {
            return Ok(Transition::Missing);
        };
        if !change.from.contains(&appointment.status) {
            return Ok(Transition::StatusMismatch(appointment.status));
        }

        appointment.status = change.to;
        if change.reason.is_some() {
            appointment.reason = change.reason.clone();
        }
        appointment.updated_at = Utc::now();
        let updated = appointment.clone();

        if change.release_slot {
            state.release(updated.slot_id);
        }
        Ok(Transition::Applied(updated))
    }

    async fn relocate(
        &self,
        id: Uuid,
        from: &[AppointmentStatus],
        replacement: &Appointment,
    ) -> Result<Relocation> {
        let mut state = self.state.lock().await;
        let Some(original) = state.appointments.get(&id).cloned() else {
            return Ok(Relocation::Missing);
        };
        if !from.contains(&original.status) {
            return Ok(Relocation::StatusMismatch(original.status));
        }
        let is_full = match state.slots.get(&replacement.slot_id) {
            None => return Ok(Relocation::TargetMissing),
            Some(slot) => slot.is_full(),
        };
        if state.holds_active(replacement.slot_id, replacement.student_id) {
            return Ok(Relocation::AlreadyBooked);
        }
        if is_full {
            return Ok(Relocation::TargetFull);
        }

        if let Some(target) = state.slots.get_mut(&replacement.slot_id) {
            target.booked_count += 1;
            target.updated_at = Utc::now();
        }
        state.release(original.slot_id);

        let cancelled = Appointment {
            status: AppointmentStatus::Cancelled,
            updated_at: Utc::now(),
            ..original
        };
        state.appointments.insert(cancelled.id, cancelled.clone());
        state
            .appointments
            .insert(replacement.id, replacement.clone());

        Ok(Relocation::Moved {
            cancelled,
            booked: replacement.clone(),
        })
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.state.lock().await.appointments.get(&id).cloned())
    }

    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let state = self.state.lock().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.created_at, a.id));
        Ok(appointments)
    }
}
