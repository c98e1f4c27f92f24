use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BookingResult;
use crate::models::{
    appointment::{Appointment, AppointmentStatus},
    principal::{Principal, Role},
    slot::{SlotResponse, check_date_range, parse_date},
};

/// Criteria for the read-only appointment views.
///
/// The date range applies to the date of the booked slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentQuery {
    pub student_id: Option<Uuid>,
    pub lecturer_owner_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Query string accepted by `GET /appointments` and `GET /appointments/summary`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListParams {
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AppointmentListParams {
    /// Builds a query scoped to what the principal may see: a student only
    /// their own bookings, a lecturer only bookings on their own slots.
    pub fn scoped_to(self, principal: &Principal) -> BookingResult<AppointmentQuery> {
        let mut query = AppointmentQuery {
            status: self.status.as_deref().map(str::parse).transpose()?,
            date_from: self.from.as_deref().map(|v| parse_date("from", v)).transpose()?,
            date_to: self.to.as_deref().map(|v| parse_date("to", v)).transpose()?,
            ..AppointmentQuery::default()
        };
        check_date_range(query.date_from, query.date_to)?;

        match principal.role {
            Role::Student => query.student_id = Some(principal.id),
            Role::Lecturer => query.lecturer_owner_id = Some(principal.id),
        }
        Ok(query)
    }
}

/// An appointment together with the slot it was booked on, if that slot
/// still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub slot: Option<SlotResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub total: usize,
    pub by_status: BTreeMap<AppointmentStatus, usize>,
    pub by_date: BTreeMap<NaiveDate, usize>,
    /// Mean hours from booking to the lecturer's decision, over approved and
    /// rejected appointments.
    pub avg_response_hours: Option<f64>,
}
