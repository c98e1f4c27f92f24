//! Appointment lifecycle.
//!
//! The engine is the only component that creates appointments, changes their
//! status, or moves a slot's booked count. Every such write is a single
//! conditional operation at the store, so two engines sharing one store cannot
//! overbook a slot or apply two transitions to the same appointment. Reads done
//! beforehand only serve authorization and early rejection; the store's answer
//! is final.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult, ConflictKind};
use crate::models::{
    appointment::{
        Action, Appointment, BookAppointmentRequest, RejectAppointmentRequest,
        RescheduleAppointmentRequest,
    },
    principal::{Principal, Role},
    slot::Slot,
};
use crate::notify::{NotificationEvent, Notifier};
use crate::registry::slot_not_found;
use crate::store::{Relocation, Reservation, StatusChange, StoreHandle, Transition};

#[derive(Clone)]
pub struct BookingEngine {
    store: StoreHandle,
    notifier: Arc<dyn Notifier>,
}

impl BookingEngine {
    pub fn new(store: StoreHandle, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Reserves one unit of the slot's capacity for the calling student.
    ///
    /// A [`ConflictKind::SlotFull`] answer means another booking won the last
    /// place; it is the one error worth retrying.
    pub async fn book_slot(
        &self,
        principal: &Principal,
        request: BookAppointmentRequest,
    ) -> BookingResult<Appointment> {
        if principal.role != Role::Student {
            return Err(BookingError::Authorization(
                "Only students can book slots".to_string(),
            ));
        }
        let request = request.validate()?;
        // Capacity and duplicates are decided by the store, duplicates first.
        let slot = self.load_slot(request.slot_id).await?;

        let appointment =
            Appointment::pending(slot.id, principal.id, request.title, request.description);
        let booked = match self
            .store
            .bounded("reserve", self.store.get().reserve(&appointment))
            .await?
        {
            Reservation::Reserved(booked) => booked,
            Reservation::SlotMissing => return Err(slot_not_found(slot.id)),
            Reservation::SlotFull => {
                debug!(slot_id = %slot.id, "Lost the race for the last place");
                return Err(BookingError::Conflict(ConflictKind::SlotFull));
            }
            Reservation::AlreadyBooked => {
                return Err(BookingError::Conflict(ConflictKind::AlreadyBooked));
            }
        };

        info!(appointment_id = %booked.id, slot_id = %booked.slot_id, student_id = %booked.student_id, "Slot booked");
        self.dispatch(NotificationEvent::Booked, &booked);
        Ok(booked)
    }

    pub async fn approve(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> BookingResult<Appointment> {
        let (appointment, slot) = self.load_with_slot(appointment_id).await?;
        let slot = ensure_slot_owner(principal, &appointment, slot.as_ref(), Action::Approve)?;
        let approved = self.apply(&appointment, Action::Approve, None).await?;

        info!(appointment_id = %approved.id, slot_id = %slot.id, "Appointment approved");
        self.dispatch(NotificationEvent::Approved, &approved);
        Ok(approved)
    }

    /// Rejects a pending appointment and frees its place on the slot.
    pub async fn reject(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
        request: RejectAppointmentRequest,
    ) -> BookingResult<Appointment> {
        let (appointment, slot) = self.load_with_slot(appointment_id).await?;
        ensure_slot_owner(principal, &appointment, slot.as_ref(), Action::Reject)?;
        let rejected = self
            .apply(&appointment, Action::Reject, request.reason())
            .await?;

        info!(appointment_id = %rejected.id, "Appointment rejected");
        self.dispatch(NotificationEvent::Rejected, &rejected);
        Ok(rejected)
    }

    /// Withdraws a pending or approved appointment. Either the student who
    /// booked it or the lecturer who owns the slot may cancel.
    pub async fn cancel(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> BookingResult<Appointment> {
        let (appointment, slot) = self.load_with_slot(appointment_id).await?;
        let is_student = appointment.student_id == principal.id;
        let is_owner = slot.as_ref().is_some_and(|slot| slot.owner_id == principal.id);
        if !is_student && !is_owner {
            return Err(BookingError::Authorization(format!(
                "Not allowed to cancel appointment {appointment_id}"
            )));
        }
        let cancelled = self.apply(&appointment, Action::Cancel, None).await?;

        info!(appointment_id = %cancelled.id, by_owner = is_owner, "Appointment cancelled");
        self.dispatch(NotificationEvent::Cancelled, &cancelled);
        Ok(cancelled)
    }

    /// Moves a booking to another slot.
    ///
    /// The new slot is reserved before the old one is released, all in one
    /// store operation; if the new slot is full nothing changes. The original
    /// appointment ends up cancelled and a new pending one is returned.
    pub async fn reschedule(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> BookingResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        if appointment.student_id != principal.id {
            return Err(BookingError::Authorization(format!(
                "Only the booking student can reschedule appointment {appointment_id}"
            )));
        }
        Action::Reschedule.check(appointment.status)?;
        if request.slot_id == appointment.slot_id {
            return Err(BookingError::Validation(
                "Appointment is already booked on this slot".to_string(),
            ));
        }
        let target = self.load_slot(request.slot_id).await?;

        let replacement = Appointment::pending(
            target.id,
            appointment.student_id,
            appointment.title.clone(),
            appointment.description.clone(),
        );
        let from = Action::Reschedule.allowed_from();
        let (cancelled, booked) = match self
            .store
            .bounded(
                "relocate",
                self.store.get().relocate(appointment.id, from, &replacement),
            )
            .await?
        {
            Relocation::Moved { cancelled, booked } => (cancelled, booked),
            Relocation::Missing => return Err(appointment_not_found(appointment_id)),
            Relocation::StatusMismatch(current) => {
                return Err(BookingError::Conflict(ConflictKind::InvalidTransition {
                    from: current,
                    action: Action::Reschedule,
                }));
            }
            Relocation::TargetMissing => return Err(slot_not_found(target.id)),
            Relocation::TargetFull => return Err(BookingError::Conflict(ConflictKind::SlotFull)),
            Relocation::AlreadyBooked => {
                return Err(BookingError::Conflict(ConflictKind::AlreadyBooked));
            }
        };

        info!(
            from_appointment = %cancelled.id,
            to_appointment = %booked.id,
            from_slot = %cancelled.slot_id,
            to_slot = %booked.slot_id,
            "Appointment rescheduled"
        );
        self.dispatch(NotificationEvent::Cancelled, &cancelled);
        self.dispatch(NotificationEvent::Rescheduled, &booked);
        Ok(booked)
    }

    /// Reads one appointment on behalf of the student who booked it or the
    /// lecturer who owns its slot.
    pub async fn get_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> BookingResult<Appointment> {
        let (appointment, slot) = self.load_with_slot(appointment_id).await?;
        let is_owner = slot.is_some_and(|slot| slot.owner_id == principal.id);
        if appointment.student_id != principal.id && !is_owner {
            return Err(BookingError::Authorization(format!(
                "Not allowed to view appointment {appointment_id}"
            )));
        }
        Ok(appointment)
    }

    async fn apply(
        &self,
        appointment: &Appointment,
        action: Action,
        reason: Option<String>,
    ) -> BookingResult<Appointment> {
        action.check(appointment.status)?;
        let change = StatusChange {
            id: appointment.id,
            from: action.allowed_from().to_vec(),
            to: action.target(),
            reason,
            release_slot: action.releases_capacity(),
        };

        match self
            .store
            .bounded("transition", self.store.get().transition(&change))
            .await?
        {
            Transition::Applied(updated) => Ok(updated),
            Transition::Missing => Err(appointment_not_found(appointment.id)),
            Transition::StatusMismatch(current) => {
                debug!(appointment_id = %appointment.id, %current, %action, "Status changed underneath");
                Err(BookingError::Conflict(ConflictKind::InvalidTransition {
                    from: current,
                    action,
                }))
            }
        }
    }

    async fn load_slot(&self, slot_id: Uuid) -> BookingResult<Slot> {
        self.store
            .bounded("get_slot", self.store.get().get_slot(slot_id))
            .await?
            .ok_or_else(|| slot_not_found(slot_id))
    }

    async fn load_appointment(&self, appointment_id: Uuid) -> BookingResult<Appointment> {
        self.store
            .bounded(
                "get_appointment",
                self.store.get().get_appointment(appointment_id),
            )
            .await?
            .ok_or_else(|| appointment_not_found(appointment_id))
    }

    /// The appointment plus its slot. The slot is `None` only once it has been
    /// deleted, which requires every appointment on it to be final.
    async fn load_with_slot(
        &self,
        appointment_id: Uuid,
    ) -> BookingResult<(Appointment, Option<Slot>)> {
        let appointment = self.load_appointment(appointment_id).await?;
        let slot = self
            .store
            .bounded("get_slot", self.store.get().get_slot(appointment.slot_id))
            .await?;
        Ok((appointment, slot))
    }

    fn dispatch(&self, event: NotificationEvent, appointment: &Appointment) {
        let notifier = Arc::clone(&self.notifier);
        let appointment = appointment.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(event, &appointment).await {
                warn!(%event, appointment_id = %appointment.id, error = %e, "Notification failed");
            }
        });
    }
}

fn ensure_slot_owner<'a>(
    principal: &Principal,
    appointment: &Appointment,
    slot: Option<&'a Slot>,
    action: Action,
) -> BookingResult<&'a Slot> {
    match slot {
        Some(slot) if slot.owner_id == principal.id => Ok(slot),
        Some(_) => Err(BookingError::Authorization(format!(
            "Only the slot owner can {action} appointment {}",
            appointment.id
        ))),
        // A deleted slot only leaves final appointments behind.
        None => Err(BookingError::Conflict(ConflictKind::InvalidTransition {
            from: appointment.status,
            action,
        })),
    }
}

fn appointment_not_found(appointment_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Appointment with ID {appointment_id} not found"))
}
