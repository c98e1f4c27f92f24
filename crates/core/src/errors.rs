use std::fmt;

use thiserror::Error;

use crate::models::appointment::{Action, AppointmentStatus};

/// Why a request collided with the current state of a slot or appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The slot has no remaining capacity. The only retryable conflict.
    SlotFull,
    /// The student already holds a pending or approved appointment on the slot.
    AlreadyBooked,
    /// The appointment's status does not allow the requested action.
    InvalidTransition {
        from: AppointmentStatus,
        action: Action,
    },
    /// The slot still has active bookings and cannot be deleted.
    SlotHasBookings { booked: u32 },
    /// A capacity edit would drop below the number of active bookings.
    CapacityBelowBookings { booked: u32, requested: u32 },
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotFull => write!(f, "slot is fully booked"),
            Self::AlreadyBooked => write!(f, "student already has an active appointment on this slot"),
            Self::InvalidTransition { from, action } => {
                write!(f, "cannot {action} an appointment that is {from}")
            }
            Self::SlotHasBookings { booked } => {
                write!(f, "slot has {booked} active booking(s); cancel them first")
            }
            Self::CapacityBelowBookings { booked, requested } => write!(
                f,
                "capacity {requested} is below the {booked} active booking(s)"
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Storage error: {0}")]
    Storage(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Whether the caller may retry the same request after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(ConflictKind::SlotFull))
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
