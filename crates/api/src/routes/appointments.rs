use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/appointments",
            post(handlers::appointments::book_slot).get(handlers::appointments::list_appointments),
        )
        .route(
            "/appointments/summary",
            get(handlers::appointments::summarize_appointments),
        )
        .route(
            "/appointments/:id",
            get(handlers::appointments::get_appointment),
        )
        .route(
            "/appointments/:id/approve",
            put(handlers::appointments::approve_appointment),
        )
        .route(
            "/appointments/:id/reject",
            put(handlers::appointments::reject_appointment),
        )
        .route(
            "/appointments/:id/cancel",
            put(handlers::appointments::cancel_appointment),
        )
        .route(
            "/appointments/:id/reschedule",
            put(handlers::appointments::reschedule_appointment),
        )
}
