use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use slotbook_core::{
    errors::BookingError,
    models::{
        appointment::{
            Appointment, BookAppointmentRequest, RejectAppointmentRequest,
            RescheduleAppointmentRequest,
        },
        report::{AppointmentDetails, AppointmentListParams, AppointmentSummary},
    },
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{
        auth::Caller,
        error_handling::AppError,
        validation::{ValidJson, ValidPath},
    },
};

fn list_params(
    params: Result<Query<AppointmentListParams>, QueryRejection>,
) -> Result<AppointmentListParams, AppError> {
    let Query(params) = params.map_err(|e| BookingError::Validation(e.body_text()))?;
    Ok(params)
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidJson(payload): ValidJson<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.engine.book_slot(&principal, payload).await?;
    info!(
        appointment_id = %appointment.id,
        slot_id = %appointment.slot_id,
        student_id = %appointment.student_id,
        "Booked slot"
    );

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    params: Result<Query<AppointmentListParams>, QueryRejection>,
) -> Result<Json<Vec<AppointmentDetails>>, AppError> {
    let query = list_params(params)?.scoped_to(&principal)?;
    Ok(Json(state.queries.find(&query).await?))
}

#[axum::debug_handler]
pub async fn summarize_appointments(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    params: Result<Query<AppointmentListParams>, QueryRejection>,
) -> Result<Json<AppointmentSummary>, AppError> {
    let query = list_params(params)?.scoped_to(&principal)?;
    Ok(Json(state.queries.summarize(&query).await?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.engine.get_appointment(&principal, id).await?))
}

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.engine.approve(&principal, id).await?;
    info!(appointment_id = %id, "Approved appointment");

    Ok(Json(appointment))
}

/// The body is optional; an empty request rejects without a reason.
#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
    body: Bytes,
) -> Result<Json<Appointment>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RejectAppointmentRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| BookingError::Validation(format!("Invalid reject body: {}", e)))?
    };
    let appointment = state.engine.reject(&principal, id, request).await?;
    info!(appointment_id = %id, "Rejected appointment");

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.engine.cancel(&principal, id).await?;
    info!(appointment_id = %id, "Cancelled appointment");

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<RescheduleAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.engine.reschedule(&principal, id, payload).await?;
    info!(from = %id, to = %appointment.id, slot_id = %appointment.slot_id, "Rescheduled appointment");

    Ok((StatusCode::CREATED, Json(appointment)))
}
