//! Persistence port for slots and appointments.
//!
//! Every method that touches a slot's booked count is one atomic unit at the
//! store: the bound check, the counter change and the appointment write either
//! all happen or none do. A refused conditional update is reported through the
//! typed outcome, never as an error; `Err` is reserved for the store itself
//! failing.

pub mod memory;

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use eyre::{Result, eyre};
use tracing::error;
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};
use crate::models::{
    appointment::{Appointment, AppointmentFilter, AppointmentStatus},
    slot::{Slot, SlotFilter},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    Updated(Slot),
    Missing,
    CapacityBelowBookings { booked: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotRemoval {
    Removed,
    Missing,
    HasBookings { booked: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    Reserved(Appointment),
    SlotMissing,
    SlotFull,
    AlreadyBooked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied(Appointment),
    Missing,
    StatusMismatch(AppointmentStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Relocation {
    Moved {
        cancelled: Appointment,
        booked: Appointment,
    },
    Missing,
    StatusMismatch(AppointmentStatus),
    TargetMissing,
    TargetFull,
    AlreadyBooked,
}

/// Compare-and-swap on an appointment's status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub id: Uuid,
    pub from: Vec<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub reason: Option<String>,
    /// Decrement the slot's booked count in the same unit.
    pub release_slot: bool,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_slot(&self, slot: &Slot) -> Result<Slot>;

    async fn get_slot(&self, id: Uuid) -> Result<Option<Slot>>;

    /// Slots matching `filter`, ordered by date, start time and id.
    async fn list_slots(&self, filter: &SlotFilter) -> Result<Vec<Slot>>;

    /// Writes the detail fields of `slot`, provided its capacity still covers
    /// the stored booked count. The booked count in `slot` is ignored.
    async fn update_slot(&self, slot: &Slot) -> Result<SlotUpdate>;

    /// Deletes the slot only while nothing is booked on it.
    async fn delete_slot(&self, id: Uuid) -> Result<SlotRemoval>;

    /// Increments the booked count of `appointment.slot_id` if it is below
    /// capacity and inserts `appointment`. A student already holding an active
    /// appointment on the slot gets [`Reservation::AlreadyBooked`], even when
    /// the slot is full.
    async fn reserve(&self, appointment: &Appointment) -> Result<Reservation>;

    async fn transition(&self, change: &StatusChange) -> Result<Transition>;

    /// Reserves `replacement.slot_id` first, then cancels appointment `id`
    /// (which must be in one of `from`), releases its slot and inserts
    /// `replacement`. Nothing is written unless every step succeeds. A
    /// duplicate on the target is reported before a full target.
    async fn relocate(
        &self,
        id: Uuid,
        from: &[AppointmentStatus],
        replacement: &Appointment,
    ) -> Result<Relocation>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// Appointments matching `filter`, ordered by creation time and id.
    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;
}

/// A store shared by the registry, the engine and the query layer, with the
/// deadline every call must meet.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn BookingStore>,
    timeout: Duration,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn BookingStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn get(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    /// Awaits a store call under the deadline. Both a failing store and an
    /// elapsed deadline become [`BookingError::Storage`].
    pub(crate) async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> BookingResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Store call failed");
                Err(BookingError::Storage(e.wrap_err(format!("{operation} failed"))))
            }
            Err(_) => {
                error!(operation, timeout = ?self.timeout, "Store call timed out");
                Err(BookingError::Storage(eyre!(
                    "{operation} timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}
