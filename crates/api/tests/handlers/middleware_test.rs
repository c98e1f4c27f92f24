use axum::{body::to_bytes, http::StatusCode};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use slotbook_api::{
    config::{StorageBackend, parse_log_level},
    middleware::error_handling::map_error,
};
use slotbook_core::{
    errors::{BookingError, ConflictKind},
    models::appointment::{Action, AppointmentStatus},
};
use tracing::Level;

use crate::test_utils::TestContext;

async fn body_of(error: BookingError) -> (StatusCode, Value) {
    let response = map_error(error);
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[rstest]
#[case::not_found(BookingError::NotFound("Slot not found".into()), StatusCode::NOT_FOUND)]
#[case::validation(BookingError::Validation("Invalid input".into()), StatusCode::BAD_REQUEST)]
#[case::authentication(BookingError::Authentication("missing header".into()), StatusCode::UNAUTHORIZED)]
#[case::authorization(BookingError::Authorization("Not authorized".into()), StatusCode::FORBIDDEN)]
#[case::already_booked(BookingError::Conflict(ConflictKind::AlreadyBooked), StatusCode::CONFLICT)]
#[case::invalid_transition(
    BookingError::Conflict(ConflictKind::InvalidTransition {
        from: AppointmentStatus::Rejected,
        action: Action::Cancel,
    }),
    StatusCode::CONFLICT
)]
#[case::storage(BookingError::Storage(eyre::eyre!("pool timed out")), StatusCode::SERVICE_UNAVAILABLE)]
#[case::internal(BookingError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
#[tokio::test]
async fn test_error_status_mapping(#[case] error: BookingError, #[case] expected: StatusCode) {
    let message = error.to_string();

    let (status, body) = body_of(error).await;

    assert_eq!(status, expected);
    assert_eq!(body["error"], message);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_slot_full_is_marked_retryable() {
    let (status, body) = body_of(BookingError::Conflict(ConflictKind::SlotFull)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict: slot is fully booked");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_health_and_version_need_no_identity() {
    let ctx = TestContext::new();

    let health = ctx.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    let version = ctx.server.get("/version").await;
    version.assert_status_ok();
    assert_eq!(version.json::<Value>()["version"], env!("CARGO_PKG_VERSION"));
}

#[rstest]
#[case("debug", Level::DEBUG)]
#[case(" WARN ", Level::WARN)]
#[case("verbose", Level::INFO)]
fn test_log_level_parsing(#[case] raw: &str, #[case] expected: Level) {
    assert_eq!(parse_log_level(raw), expected);
}

#[rstest]
#[case("postgres", StorageBackend::Postgres)]
#[case("Memory", StorageBackend::Memory)]
fn test_storage_backend_parsing(#[case] raw: &str, #[case] expected: StorageBackend) {
    assert_eq!(raw.parse::<StorageBackend>().unwrap(), expected);
}

#[test]
fn test_unknown_storage_backend_is_an_error() {
    assert!("sqlite".parse::<StorageBackend>().is_err());
}
