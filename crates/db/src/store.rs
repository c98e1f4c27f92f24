//! [`BookingStore`] backed by PostgreSQL.
//!
//! Seat accounting relies on conditional updates inside transactions and on
//! the partial unique index over active appointments, so concurrent requests
//! from any number of API processes stay within capacity.

use async_trait::async_trait;
use eyre::Result;
use slotbook_core::models::{
    appointment::{Appointment, AppointmentFilter, AppointmentStatus},
    slot::{Slot, SlotFilter},
};
use slotbook_core::store::{
    BookingStore, Relocation, Reservation, SlotRemoval, SlotUpdate, StatusChange, Transition,
};
use uuid::Uuid;

use crate::DbPool;
use crate::models::{DbAppointment, DbSlot, to_db_count};
use crate::repositories::{appointment as appointments, slot as slots};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn slot_row(slot: &Slot) -> Result<DbSlot> {
    Ok(DbSlot {
        id: slot.id,
        owner_id: slot.owner_id,
        location: slot.location.clone(),
        date: slot.date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        capacity: to_db_count(slot.capacity)?,
        booked_count: to_db_count(slot.booked_count)?,
        created_at: slot.created_at,
        updated_at: slot.updated_at,
    })
}

fn appointment_row(appointment: &Appointment) -> DbAppointment {
    DbAppointment {
        id: appointment.id,
        slot_id: appointment.slot_id,
        student_id: appointment.student_id,
        title: appointment.title.clone(),
        description: appointment.description.clone(),
        status: appointment.status.as_str().to_string(),
        reason: appointment.reason.clone(),
        created_at: appointment.created_at,
        updated_at: appointment.updated_at,
    }
}

fn booked(count: i32) -> u32 {
    u32::try_from(count).unwrap_or_default()
}

#[async_trait]
impl BookingStore for PgStore {
    async fn insert_slot(&self, slot: &Slot) -> Result<Slot> {
        let row = slots::insert_slot(&self.pool, &slot_row(slot)?).await?;
        row.try_into()
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<Slot>> {
        slots::get_slot_by_id(&self.pool, id)
            .await?
            .map(Slot::try_from)
            .transpose()
    }

    async fn list_slots(&self, filter: &SlotFilter) -> Result<Vec<Slot>> {
        slots::list_slots(&self.pool, filter)
            .await?
            .into_iter()
            .map(Slot::try_from)
            .collect()
    }

    async fn update_slot(&self, slot: &Slot) -> Result<SlotUpdate> {
        if let Some(row) = slots::update_slot_details(&self.pool, &slot_row(slot)?).await? {
            return Ok(SlotUpdate::Updated(row.try_into()?));
        }

        Ok(match slots::get_booked_count(&self.pool, slot.id).await? {
            None => SlotUpdate::Missing,
            Some(count) => SlotUpdate::CapacityBelowBookings {
                booked: booked(count),
            },
        })
    }

    async fn delete_slot(&self, id: Uuid) -> Result<SlotRemoval> {
        if slots::delete_slot_if_unbooked(&self.pool, id).await? {
            return Ok(SlotRemoval::Removed);
        }

        Ok(match slots::get_booked_count(&self.pool, id).await? {
            None => SlotRemoval::Missing,
            Some(count) => SlotRemoval::HasBookings {
                booked: booked(count),
            },
        })
    }

    async fn reserve(&self, appointment: &Appointment) -> Result<Reservation> {
        appointments::reserve(&self.pool, &appointment_row(appointment)).await
    }

    async fn transition(&self, change: &StatusChange) -> Result<Transition> {
        appointments::transition(&self.pool, change).await
    }

    async fn relocate(
        &self,
        id: Uuid,
        from: &[AppointmentStatus],
        replacement: &Appointment,
    ) -> Result<Relocation> {
        appointments::relocate(&self.pool, id, from, &appointment_row(replacement)).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        appointments::get_appointment_by_id(&self.pool, id)
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        appointments::find_appointments(&self.pool, filter)
            .await?
            .into_iter()
            .map(Appointment::try_from)
            .collect()
    }
}
