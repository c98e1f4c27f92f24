use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::errors::BookingResult;
use crate::models::{
    appointment::{AppointmentFilter, AppointmentStatus},
    report::{AppointmentDetails, AppointmentQuery, AppointmentSummary},
    slot::{Slot, SlotFilter, SlotResponse},
};
use crate::store::StoreHandle;

/// Read-only appointment views. Never writes.
#[derive(Clone)]
pub struct AppointmentQueries {
    store: StoreHandle,
}

impl AppointmentQueries {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Appointments matching `query`, ordered by slot date, slot start time,
    /// booking time and id.
    ///
    /// Appointments whose slot has been deleted are ordered by their booking
    /// date and drop out whenever a date range is requested.
    pub async fn find(&self, query: &AppointmentQuery) -> BookingResult<Vec<AppointmentDetails>> {
        let slot_scope = if query.lecturer_owner_id.is_some()
            || query.date_from.is_some()
            || query.date_to.is_some()
        {
            let filter = SlotFilter {
                owner_id: query.lecturer_owner_id,
                date_from: query.date_from,
                date_to: query.date_to,
                ..SlotFilter::default()
            };
            let slots = self.list_slots(&filter).await?;
            if slots.is_empty() {
                return Ok(Vec::new());
            }
            Some(slots)
        } else {
            None
        };

        let filter = AppointmentFilter {
            student_id: query.student_id,
            slot_ids: slot_scope
                .as_ref()
                .map(|slots| slots.iter().map(|slot| slot.id).collect()),
            status: query.status,
        };
        let appointments = self
            .store
            .bounded(
                "find_appointments",
                self.store.get().find_appointments(&filter),
            )
            .await?;

        let slots = match slot_scope {
            Some(slots) => slots,
            None => {
                let ids: HashSet<Uuid> = appointments.iter().map(|a| a.slot_id).collect();
                if ids.is_empty() {
                    Vec::new()
                } else {
                    let filter = SlotFilter {
                        ids: Some(ids.into_iter().collect()),
                        ..SlotFilter::default()
                    };
                    self.list_slots(&filter).await?
                }
            }
        };
        let slots: HashMap<Uuid, Slot> = slots.into_iter().map(|slot| (slot.id, slot)).collect();

        let mut details: Vec<AppointmentDetails> = appointments
            .into_iter()
            .map(|appointment| AppointmentDetails {
                slot: slots.get(&appointment.slot_id).cloned().map(SlotResponse::from),
                appointment,
            })
            .collect();
        details.sort_by_key(|d| {
            let (date, start) = schedule_key(d);
            (date, start, d.appointment.created_at, d.appointment.id)
        });
        Ok(details)
    }

    /// Counts per status and per day plus the mean decision time.
    pub async fn summarize(&self, query: &AppointmentQuery) -> BookingResult<AppointmentSummary> {
        let details = self.find(query).await?;

        let mut by_status = BTreeMap::new();
        let mut by_date = BTreeMap::new();
        let mut response_hours = Vec::new();
        for entry in &details {
            let appointment = &entry.appointment;
            *by_status.entry(appointment.status).or_insert(0) += 1;
            *by_date.entry(schedule_key(entry).0).or_insert(0) += 1;

            if matches!(
                appointment.status,
                AppointmentStatus::Approved | AppointmentStatus::Rejected
            ) {
                let elapsed = appointment.updated_at - appointment.created_at;
                response_hours.push(elapsed.num_seconds() as f64 / 3600.0);
            }
        }

        let avg_response_hours = if response_hours.is_empty() {
            None
        } else {
            Some(response_hours.iter().sum::<f64>() / response_hours.len() as f64)
        };

        Ok(AppointmentSummary {
            total: details.len(),
            by_status,
            by_date,
            avg_response_hours,
        })
    }

    async fn list_slots(&self, filter: &SlotFilter) -> BookingResult<Vec<Slot>> {
        self.store
            .bounded("list_slots", self.store.get().list_slots(filter))
            .await
    }
}

fn schedule_key(details: &AppointmentDetails) -> (NaiveDate, NaiveTime) {
    match &details.slot {
        Some(slot) => (slot.date, slot.start_time),
        None => (details.appointment.created_at.date_naive(), NaiveTime::MIN),
    }
}
