use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult, ConflictKind};
use crate::models::slot::non_blank;

/// Appointment lifecycle.
///
/// `Pending` is the only initial state. `Rejected` and `Cancelled` are final,
/// and `Approved` can only move on to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Cancelled,
    Rejected,
}

/// Statuses that hold a unit of their slot's capacity.
pub const ACTIVE_STATUSES: [AppointmentStatus; 2] =
    [AppointmentStatus::Pending, AppointmentStatus::Approved];

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
        }
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "approved" => Ok(AppointmentStatus::Approved),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "rejected" => Ok(AppointmentStatus::Rejected),
            other => Err(BookingError::Validation(format!(
                "unknown appointment status '{other}'"
            ))),
        }
    }
}

/// A state-changing operation on an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
    Cancel,
    Reschedule,
}

impl Action {
    pub fn allowed_from(&self) -> &'static [AppointmentStatus] {
        match self {
            Action::Approve | Action::Reject => &[AppointmentStatus::Pending],
            Action::Cancel | Action::Reschedule => &ACTIVE_STATUSES,
        }
    }

    /// Status the appointment ends up in. A reschedule cancels the original.
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Action::Approve => AppointmentStatus::Approved,
            Action::Reject => AppointmentStatus::Rejected,
            Action::Cancel | Action::Reschedule => AppointmentStatus::Cancelled,
        }
    }

    /// Whether the action gives the slot's capacity unit back.
    pub fn releases_capacity(&self) -> bool {
        !matches!(self, Action::Approve)
    }

    pub fn check(&self, current: AppointmentStatus) -> BookingResult<()> {
        if self.allowed_from().contains(&current) {
            Ok(())
        } else {
            Err(BookingError::Conflict(ConflictKind::InvalidTransition {
                from: current,
                action: *self,
            }))
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Cancel => "cancel",
            Action::Reschedule => "reschedule",
        })
    }
}

/// A student's claim on a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn pending(slot_id: Uuid, student_id: Uuid, title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slot_id,
            student_id,
            title,
            description,
            status: AppointmentStatus::Pending,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookAppointmentRequest {
    pub slot_id: Uuid,
    pub title: String,
    pub description: String,
}

/// Validated booking input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub slot_id: Uuid,
    pub title: String,
    pub description: String,
}

impl BookAppointmentRequest {
    pub fn validate(self) -> BookingResult<NewAppointment> {
        Ok(NewAppointment {
            slot_id: self.slot_id,
            title: non_blank("title", &self.title)?,
            description: non_blank("description", &self.description)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectAppointmentRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl RejectAppointmentRequest {
    /// Trimmed reason, with blank input treated as absent.
    pub fn reason(self) -> Option<String> {
        self.reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RescheduleAppointmentRequest {
    pub slot_id: Uuid,
}

/// Store-level appointment selection. Every present criterion must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub student_id: Option<Uuid>,
    pub slot_ids: Option<Vec<Uuid>>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.student_id
            .is_none_or(|student| student == appointment.student_id)
            && self
                .slot_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&appointment.slot_id))
            && self.status.is_none_or(|status| status == appointment.status)
    }
}
