use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use slotbook_core::{
    errors::BookingError,
    models::slot::{CreateSlotRequest, SlotListParams, SlotResponse, UpdateSlotRequest},
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

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidJson(payload): ValidJson<CreateSlotRequest>,
) -> Result<(StatusCode, Json<SlotResponse>), AppError> {
    let slot = state.registry.create_slot(&principal, payload).await?;
    info!(slot_id = %slot.id, owner_id = %slot.owner_id, "Created slot");

    Ok((StatusCode::CREATED, Json(slot.into())))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<ApiState>>,
    Caller(_principal): Caller,
    params: Result<Query<SlotListParams>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let Query(params) = params.map_err(|e| BookingError::Validation(e.body_text()))?;
    let slots = state.registry.list_slots(&params.into_filter()?).await?;

    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

#[axum::debug_handler]
pub async fn get_slot(
    State(state): State<Arc<ApiState>>,
    Caller(_principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<SlotResponse>, AppError> {
    let slot = state.registry.get_slot(id).await?;
    Ok(Json(slot.into()))
}

#[axum::debug_handler]
pub async fn update_slot(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<UpdateSlotRequest>,
) -> Result<Json<SlotResponse>, AppError> {
    let slot = state
        .registry
        .update_slot_details(id, &principal, payload)
        .await?;
    info!(slot_id = %slot.id, "Updated slot");

    Ok(Json(slot.into()))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.registry.delete_slot(id, &principal).await?;
    info!(slot_id = %id, "Deleted slot");

    Ok(StatusCode::NO_CONTENT)
}
