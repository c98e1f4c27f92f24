use crate::models::DbSlot;
use eyre::Result;
use slotbook_core::models::slot::SlotFilter;
use sqlx::{Pool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

pub(crate) const SLOT_COLUMNS: &str = "id, owner_id, location, date, start_time, end_time, capacity, booked_count, created_at, updated_at";

pub async fn insert_slot(pool: &Pool<Postgres>, slot: &DbSlot) -> Result<DbSlot> {
    let inserted = sqlx::query_as::<_, DbSlot>(&format!(
        r#"
        INSERT INTO slots (id, owner_id, location, date, start_time, end_time, capacity, booked_count, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(slot.id)
    .bind(slot.owner_id)
    .bind(&slot.location)
    .bind(slot.date)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(slot.capacity)
    .bind(slot.booked_count)
    .bind(slot.created_at)
    .bind(slot.updated_at)
    .fetch_one(pool)
    .await?;

    debug!(slot_id = %inserted.id, "Inserted slot");
    Ok(inserted)
}

pub async fn get_slot_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

pub async fn list_slots(pool: &Pool<Postgres>, filter: &SlotFilter) -> Result<Vec<DbSlot>> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {SLOT_COLUMNS} FROM slots WHERE TRUE"
    ));

    if let Some(ids) = &filter.ids {
        query.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(owner_id) = filter.owner_id {
        query.push(" AND owner_id = ").push_bind(owner_id);
    }
    if let Some(from) = filter.date_from {
        query.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        query.push(" AND date <= ").push_bind(to);
    }
    if filter.only_available {
        query.push(" AND booked_count < capacity");
    }
    query.push(" ORDER BY date ASC, start_time ASC, id ASC");

    let slots = query.build_query_as::<DbSlot>().fetch_all(pool).await?;
    Ok(slots)
}

/// Writes the detail columns while the new capacity still covers the stored
/// booked count. `None` means the row is missing or the guard refused.
pub async fn update_slot_details(pool: &Pool<Postgres>, slot: &DbSlot) -> Result<Option<DbSlot>> {
    let updated = sqlx::query_as::<_, DbSlot>(&format!(
        r#"
        UPDATE slots
        SET location = $2, date = $3, start_time = $4, end_time = $5, capacity = $6, updated_at = $7
        WHERE id = $1 AND booked_count <= $6
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(slot.id)
    .bind(&slot.location)
    .bind(slot.date)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(slot.capacity)
    .bind(slot.updated_at)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

/// Returns whether a row was deleted.
pub async fn delete_slot_if_unbooked(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM slots
        WHERE id = $1 AND booked_count = 0
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_booked_count(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<i32>> {
    let booked = sqlx::query_scalar::<_, i32>("SELECT booked_count FROM slots WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(booked)
}
