use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eyre::{Report, Result, WrapErr};
use serde::{Deserialize, Serialize};
use slotbook_core::models::{appointment::Appointment, slot::Slot};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub location: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
    pub booked_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbSlot> for Slot {
    type Error = Report;

    fn try_from(row: DbSlot) -> Result<Self> {
        Ok(Slot {
            capacity: u32::try_from(row.capacity)
                .wrap_err_with(|| format!("slot {} has negative capacity", row.id))?,
            booked_count: u32::try_from(row.booked_count)
                .wrap_err_with(|| format!("slot {} has negative booked_count", row.id))?,
            id: row.id,
            owner_id: row.owner_id,
            location: row.location,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = Report;

    fn try_from(row: DbAppointment) -> Result<Self> {
        Ok(Appointment {
            status: row
                .status
                .parse()
                .map_err(|e| eyre::eyre!("appointment {}: {}", row.id, e))?,
            id: row.id,
            slot_id: row.slot_id,
            student_id: row.student_id,
            title: row.title,
            description: row.description,
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Counters are stored as INTEGER; values above `i32::MAX` are refused.
pub fn to_db_count(value: u32) -> Result<i32> {
    i32::try_from(value).wrap_err("count does not fit in an INTEGER column")
}
