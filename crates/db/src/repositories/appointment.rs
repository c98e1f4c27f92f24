use crate::models::DbAppointment;
use chrono::Utc;
use eyre::{Result, eyre};
use slotbook_core::models::appointment::{AppointmentFilter, AppointmentStatus};
use slotbook_core::store::{Relocation, Reservation, StatusChange, Transition};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

const APPOINTMENT_COLUMNS: &str =
    "id, slot_id, student_id, title, description, status, reason, created_at, updated_at";

enum SeatClaim {
    Claimed,
    Full,
    Missing,
}

fn status_names(statuses: &[AppointmentStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn parse_status(raw: &str) -> Result<AppointmentStatus> {
    raw.parse()
        .map_err(|e| eyre!("unexpected appointment status in store: {}", e))
}

async fn claim_seat(conn: &mut PgConnection, slot_id: Uuid) -> Result<SeatClaim> {
    let claimed = sqlx::query(
        r#"
        UPDATE slots
        SET booked_count = booked_count + 1, updated_at = $2
        WHERE id = $1 AND booked_count < capacity
        "#,
    )
    .bind(slot_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if claimed.rows_affected() == 1 {
        return Ok(SeatClaim::Claimed);
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM slots WHERE id = $1)")
        .bind(slot_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(if exists { SeatClaim::Full } else { SeatClaim::Missing })
}

async fn release_seat(conn: &mut PgConnection, slot_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE slots
        SET booked_count = booked_count - 1, updated_at = $2
        WHERE id = $1 AND booked_count > 0
        "#,
    )
    .bind(slot_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Row locks on the given slots, always taken in id order so transactions
/// touching the same pair of slots queue instead of deadlocking.
async fn lock_slots(conn: &mut PgConnection, slot_ids: &[Uuid]) -> Result<()> {
    sqlx::query("SELECT id FROM slots WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(slot_ids)
        .fetch_all(&mut *conn)
        .await?;

    Ok(())
}

async fn holds_active(conn: &mut PgConnection, slot_id: Uuid, student_id: Uuid) -> Result<bool> {
    let held = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM appointments
            WHERE slot_id = $1 AND student_id = $2 AND status IN ('pending', 'approved')
        )
        "#,
    )
    .bind(slot_id)
    .bind(student_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(held)
}

/// Inserts unless the partial unique index already holds an active row for
/// the same student and slot.
async fn insert_active(
    conn: &mut PgConnection,
    appointment: &DbAppointment,
) -> Result<Option<DbAppointment>> {
    let inserted = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        INSERT INTO appointments (id, slot_id, student_id, title, description, status, reason, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT DO NOTHING
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment.id)
    .bind(appointment.slot_id)
    .bind(appointment.student_id)
    .bind(&appointment.title)
    .bind(&appointment.description)
    .bind(&appointment.status)
    .bind(&appointment.reason)
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(inserted)
}

pub async fn reserve(pool: &Pool<Postgres>, appointment: &DbAppointment) -> Result<Reservation> {
    let mut tx = pool.begin().await?;

    if holds_active(&mut tx, appointment.slot_id, appointment.student_id).await? {
        tx.rollback().await?;
        return Ok(Reservation::AlreadyBooked);
    }

    match claim_seat(&mut tx, appointment.slot_id).await? {
        SeatClaim::Claimed => {}
        SeatClaim::Full => {
            tx.rollback().await?;
            return Ok(Reservation::SlotFull);
        }
        SeatClaim::Missing => {
            tx.rollback().await?;
            return Ok(Reservation::SlotMissing);
        }
    }

    let Some(inserted) = insert_active(&mut tx, appointment).await? else {
        tx.rollback().await?;
        return Ok(Reservation::AlreadyBooked);
    };

    tx.commit().await?;
    debug!(appointment_id = %inserted.id, slot_id = %inserted.slot_id, "Reserved seat");
    Ok(Reservation::Reserved(inserted.try_into()?))
}

pub async fn transition(pool: &Pool<Postgres>, change: &StatusChange) -> Result<Transition> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2, reason = COALESCE($3, reason), updated_at = $4
        WHERE id = $1 AND status = ANY($5)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(change.id)
    .bind(change.to.as_str())
    .bind(&change.reason)
    .bind(Utc::now())
    .bind(status_names(&change.from))
    .fetch_optional(&mut *tx)
    .await?;

    let Some(updated) = updated else {
        let current = sqlx::query_scalar::<_, String>("SELECT status FROM appointments WHERE id = $1")
            .bind(change.id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.rollback().await?;
        return match current {
            None => Ok(Transition::Missing),
            Some(status) => Ok(Transition::StatusMismatch(parse_status(&status)?)),
        };
    };

    if change.release_slot {
        release_seat(&mut tx, updated.slot_id).await?;
    }

    tx.commit().await?;
    debug!(appointment_id = %updated.id, status = %updated.status, "Applied status change");
    Ok(Transition::Applied(updated.try_into()?))
}

pub async fn relocate(
    pool: &Pool<Postgres>,
    id: Uuid,
    from: &[AppointmentStatus],
    replacement: &DbAppointment,
) -> Result<Relocation> {
    let mut tx = pool.begin().await?;

    let original = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(original) = original else {
        tx.rollback().await?;
        return Ok(Relocation::Missing);
    };
    let current = parse_status(&original.status)?;
    if !from.contains(&current) {
        tx.rollback().await?;
        return Ok(Relocation::StatusMismatch(current));
    }

    lock_slots(&mut tx, &[original.slot_id, replacement.slot_id]).await?;

    if holds_active(&mut tx, replacement.slot_id, replacement.student_id).await? {
        tx.rollback().await?;
        return Ok(Relocation::AlreadyBooked);
    }

    match claim_seat(&mut tx, replacement.slot_id).await? {
        SeatClaim::Claimed => {}
        SeatClaim::Full => {
            tx.rollback().await?;
            return Ok(Relocation::TargetFull);
        }
        SeatClaim::Missing => {
            tx.rollback().await?;
            return Ok(Relocation::TargetMissing);
        }
    }

    let cancelled = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'cancelled', updated_at = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;
    release_seat(&mut tx, original.slot_id).await?;

    let Some(booked) = insert_active(&mut tx, replacement).await? else {
        tx.rollback().await?;
        return Ok(Relocation::AlreadyBooked);
    };

    tx.commit().await?;
    debug!(from = %id, to = %booked.id, slot_id = %booked.slot_id, "Relocated appointment");
    Ok(Relocation::Moved {
        cancelled: cancelled.try_into()?,
        booked: booked.try_into()?,
    })
}

pub async fn get_appointment_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn find_appointments(
    pool: &Pool<Postgres>,
    filter: &AppointmentFilter,
) -> Result<Vec<DbAppointment>> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE TRUE"
    ));

    if let Some(student_id) = filter.student_id {
        query.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(slot_ids) = &filter.slot_ids {
        query.push(" AND slot_id = ANY(").push_bind(slot_ids.clone()).push(")");
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    query.push(" ORDER BY created_at ASC, id ASC");

    let appointments = query
        .build_query_as::<DbAppointment>()
        .fetch_all(pool)
        .await?;
    Ok(appointments)
}
