use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// A lecturer's bookable time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub location: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub booked_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Full,
}

impl Slot {
    /// Builds an unbooked slot from validated input.
    pub fn new(owner_id: Uuid, details: NewSlot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            location: details.location,
            date: details.date,
            start_time: details.start_time,
            end_time: details.end_time,
            capacity: details.capacity,
            booked_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> SlotStatus {
        if self.booked_count < self.capacity {
            SlotStatus::Available
        } else {
            SlotStatus::Full
        }
    }

    pub fn is_full(&self) -> bool {
        self.status() == SlotStatus::Full
    }

    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.booked_count)
    }
}

/// Validated slot details ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSlot {
    pub location: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSlotRequest {
    pub location: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl CreateSlotRequest {
    pub fn validate(self) -> BookingResult<NewSlot> {
        let location = non_blank("location", &self.location)?;
        let date = parse_date("date", &self.date)?;
        let start_time = parse_time("start_time", &self.start_time)?;
        let end_time = parse_time("end_time", &self.end_time)?;
        check_time_range(start_time, end_time)?;
        let capacity = check_capacity(self.capacity.unwrap_or(1))?;

        Ok(NewSlot {
            location,
            date,
            start_time,
            end_time,
            capacity,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSlotRequest {
    pub location: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<u32>,
}

/// Parsed edit of a slot's details. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotPatch {
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: Option<u32>,
}

impl UpdateSlotRequest {
    pub fn validate(self) -> BookingResult<SlotPatch> {
        let patch = SlotPatch {
            location: self
                .location
                .as_deref()
                .map(|value| non_blank("location", value))
                .transpose()?,
            date: self
                .date
                .as_deref()
                .map(|value| parse_date("date", value))
                .transpose()?,
            start_time: self
                .start_time
                .as_deref()
                .map(|value| parse_time("start_time", value))
                .transpose()?,
            end_time: self
                .end_time
                .as_deref()
                .map(|value| parse_time("end_time", value))
                .transpose()?,
            capacity: self.capacity.map(check_capacity).transpose()?,
        };

        if patch == SlotPatch::default() {
            return Err(BookingError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        Ok(patch)
    }
}

impl SlotPatch {
    /// Merges the patch onto `slot` and re-checks the time range.
    ///
    /// The booked count is carried over untouched; whether the new capacity
    /// still covers it is decided by the store at write time.
    pub fn apply(self, slot: &Slot) -> BookingResult<Slot> {
        let merged = Slot {
            location: self.location.unwrap_or_else(|| slot.location.clone()),
            date: self.date.unwrap_or(slot.date),
            start_time: self.start_time.unwrap_or(slot.start_time),
            end_time: self.end_time.unwrap_or(slot.end_time),
            capacity: self.capacity.unwrap_or(slot.capacity),
            updated_at: Utc::now(),
            ..slot.clone()
        };
        check_time_range(merged.start_time, merged.end_time)?;
        Ok(merged)
    }
}

/// Store-level slot selection. Every present criterion must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotFilter {
    pub ids: Option<Vec<Uuid>>,
    pub owner_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub only_available: bool,
}

impl SlotFilter {
    pub fn matches(&self, slot: &Slot) -> bool {
        self.ids.as_ref().is_none_or(|ids| ids.contains(&slot.id))
            && self.owner_id.is_none_or(|owner| owner == slot.owner_id)
            && self.date_from.is_none_or(|from| slot.date >= from)
            && self.date_to.is_none_or(|to| slot.date <= to)
            && (!self.only_available || !slot.is_full())
    }
}

/// Query string accepted by `GET /slots`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotListParams {
    pub owner_id: Option<Uuid>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub available: bool,
}

impl SlotListParams {
    pub fn into_filter(self) -> BookingResult<SlotFilter> {
        let filter = SlotFilter {
            ids: None,
            owner_id: self.owner_id,
            date_from: self.from.as_deref().map(|v| parse_date("from", v)).transpose()?,
            date_to: self.to.as_deref().map(|v| parse_date("to", v)).transpose()?,
            only_available: self.available,
        };
        check_date_range(filter.date_from, filter.date_to)?;
        Ok(filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub location: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub booked_count: u32,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Slot> for SlotResponse {
    fn from(slot: Slot) -> Self {
        Self {
            status: slot.status(),
            id: slot.id,
            owner_id: slot.owner_id,
            location: slot.location,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            capacity: slot.capacity,
            booked_count: slot.booked_count,
            created_at: slot.created_at,
            updated_at: slot.updated_at,
        }
    }
}

pub fn parse_date(field: &str, value: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        BookingError::Validation(format!("{field} must be a calendar date (YYYY-MM-DD)"))
    })
}

pub fn parse_time(field: &str, value: &str) -> BookingResult<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| BookingError::Validation(format!("{field} must be a time of day (HH:MM)")))
}

pub fn check_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> BookingResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(BookingError::Validation(
            "from must not be after to".to_string(),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn non_blank(field: &str, value: &str) -> BookingResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn check_time_range(start: NaiveTime, end: NaiveTime) -> BookingResult<()> {
    if start >= end {
        return Err(BookingError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }
    Ok(())
}

fn check_capacity(capacity: u32) -> BookingResult<u32> {
    if capacity < 1 {
        return Err(BookingError::Validation(
            "capacity must be at least 1".to_string(),
        ));
    }
    Ok(capacity)
}
