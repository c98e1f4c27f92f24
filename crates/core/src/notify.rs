use std::fmt;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::appointment::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEvent {
    Booked,
    Approved,
    Rejected,
    Cancelled,
    Rescheduled,
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationEvent::Booked => "booked",
            NotificationEvent::Approved => "approved",
            NotificationEvent::Rejected => "rejected",
            NotificationEvent::Cancelled => "cancelled",
            NotificationEvent::Rescheduled => "rescheduled",
        })
    }
}

/// Outbound notification of appointment changes.
///
/// Called after the change has been committed. Errors are logged by the caller
/// and never undo or fail the change.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()>;
}

/// Writes each event to the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()> {
        info!(
            %event,
            appointment_id = %appointment.id,
            slot_id = %appointment.slot_id,
            student_id = %appointment.student_id,
            "Appointment notification"
        );
        Ok(())
    }
}
