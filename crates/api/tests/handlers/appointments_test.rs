use std::sync::Arc;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::mock::MockStore;

use crate::test_utils::{ActingAs, TestContext, assert_error, lecturer, student};

fn id(value: &Value) -> &str {
    value["id"].as_str().unwrap()
}

#[tokio::test]
async fn test_booking_walkthrough() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let (s1, s2, s3) = (student(), student(), student());
    let slot = ctx.slot(&owner, 2).await;

    let first = ctx.book(&s1, &slot["id"]).await;
    first.assert_status(StatusCode::CREATED);
    let first: Value = first.json();
    assert_eq!(first["status"], "pending");
    assert_eq!(first["student_id"], s1.id.to_string());

    let second: Value = ctx.book(&s2, &slot["id"]).await.json();

    let full = ctx.book(&s3, &slot["id"]).await;
    let message = assert_error(&full, StatusCode::CONFLICT, true);
    assert!(message.contains("fully booked"), "{message}");

    let approved = ctx
        .server
        .put(&format!("/appointments/{}/approve", id(&first)))
        .acting_as(&owner)
        .await;
    approved.assert_status_ok();
    assert_eq!(approved.json::<Value>()["status"], "approved");

    ctx.server
        .put(&format!("/appointments/{}/cancel", id(&second)))
        .acting_as(&s2)
        .await
        .assert_status_ok();

    ctx.book(&s3, &slot["id"]).await.assert_status(StatusCode::CREATED);

    let current: Value = ctx
        .server
        .get(&format!("/slots/{}", id(&slot)))
        .acting_as(&owner)
        .await
        .json();
    assert_eq!(current["booked_count"], 2);
    assert_eq!(current["status"], "full");
}

#[tokio::test]
async fn test_lecturers_cannot_book_and_duplicates_conflict() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let pupil = student();
    let slot = ctx.slot(&owner, 3).await;

    let as_lecturer = ctx.book(&owner, &slot["id"]).await;
    assert_error(&as_lecturer, StatusCode::FORBIDDEN, false);

    ctx.book(&pupil, &slot["id"]).await.assert_status(StatusCode::CREATED);
    let duplicate = ctx.book(&pupil, &slot["id"]).await;
    assert_error(&duplicate, StatusCode::CONFLICT, false);

    let missing = ctx.book(&pupil, &json!(uuid::Uuid::new_v4())).await;
    assert_error(&missing, StatusCode::NOT_FOUND, false);
}

#[tokio::test]
async fn test_booking_body_is_validated() {
    let ctx = TestContext::new();
    let slot = ctx.slot(&lecturer(), 1).await;

    let blank_title = ctx
        .server
        .post("/appointments")
        .acting_as(&student())
        .json(&json!({"slot_id": slot["id"], "title": " ", "description": "x"}))
        .await;
    assert_error(&blank_title, StatusCode::BAD_REQUEST, false);

    let not_json = ctx
        .server
        .post("/appointments")
        .acting_as(&student())
        .text("slot please")
        .await;
    assert_error(&not_json, StatusCode::BAD_REQUEST, false);
}

#[tokio::test]
async fn test_only_slot_owner_decides() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let pupil = student();
    let slot = ctx.slot(&owner, 1).await;
    let appointment: Value = ctx.book(&pupil, &slot["id"]).await.json();
    let approve = format!("/appointments/{}/approve", id(&appointment));

    let stranger = ctx.server.put(&approve).acting_as(&lecturer()).await;
    assert_error(&stranger, StatusCode::FORBIDDEN, false);

    let own_student = ctx.server.put(&approve).acting_as(&pupil).await;
    assert_error(&own_student, StatusCode::FORBIDDEN, false);

    ctx.server.put(&approve).acting_as(&owner).await.assert_status_ok();
    let twice = ctx.server.put(&approve).acting_as(&owner).await;
    let message = assert_error(&twice, StatusCode::CONFLICT, false);
    assert!(message.contains("approved"), "{message}");
}

#[tokio::test]
async fn test_reject_with_and_without_reason_frees_capacity() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let slot = ctx.slot(&owner, 2).await;
    let first: Value = ctx.book(&student(), &slot["id"]).await.json();
    let second: Value = ctx.book(&student(), &slot["id"]).await.json();

    let with_reason = ctx
        .server
        .put(&format!("/appointments/{}/reject", id(&first)))
        .acting_as(&owner)
        .json(&json!({"reason": "clashes with exam"}))
        .await;
    with_reason.assert_status_ok();
    let body: Value = with_reason.json();
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["reason"], "clashes with exam");

    let bare = ctx
        .server
        .put(&format!("/appointments/{}/reject", id(&second)))
        .acting_as(&owner)
        .await;
    bare.assert_status_ok();
    assert_eq!(bare.json::<Value>()["reason"], Value::Null);

    let current: Value = ctx
        .server
        .get(&format!("/slots/{}", id(&slot)))
        .acting_as(&owner)
        .await
        .json();
    assert_eq!(current["booked_count"], 0);

    let bad_body = ctx
        .server
        .put(&format!("/appointments/{}/reject", id(&second)))
        .acting_as(&owner)
        .json(&json!({"why": "nope"}))
        .await;
    assert_error(&bad_body, StatusCode::BAD_REQUEST, false);
}

#[tokio::test]
async fn test_cancel_is_terminal() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let pupil = student();
    let slot = ctx.slot(&owner, 1).await;
    let appointment: Value = ctx.book(&pupil, &slot["id"]).await.json();
    let cancel = format!("/appointments/{}/cancel", id(&appointment));

    let other = ctx.server.put(&cancel).acting_as(&student()).await;
    assert_error(&other, StatusCode::FORBIDDEN, false);

    ctx.server.put(&cancel).acting_as(&owner).await.assert_status_ok();
    let again = ctx.server.put(&cancel).acting_as(&pupil).await;
    assert_error(&again, StatusCode::CONFLICT, false);

    let approve = ctx
        .server
        .put(&format!("/appointments/{}/approve", id(&appointment)))
        .acting_as(&owner)
        .await;
    assert_error(&approve, StatusCode::CONFLICT, false);
}

#[tokio::test]
async fn test_reschedule_moves_booking() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let pupil = student();
    let from = ctx.slot_on(&owner, "2025-03-10", "09:00", 1).await;
    let to = ctx.slot_on(&owner, "2025-03-11", "09:00", 1).await;
    let original: Value = ctx.book(&pupil, &from["id"]).await.json();
    let path = format!("/appointments/{}/reschedule", id(&original));

    let same = ctx
        .server
        .put(&path)
        .acting_as(&pupil)
        .json(&json!({"slot_id": from["id"]}))
        .await;
    assert_error(&same, StatusCode::BAD_REQUEST, false);

    let moved = ctx
        .server
        .put(&path)
        .acting_as(&pupil)
        .json(&json!({"slot_id": to["id"]}))
        .await;
    moved.assert_status(StatusCode::CREATED);
    let moved: Value = moved.json();
    assert_eq!(moved["slot_id"], to["id"]);
    assert_eq!(moved["status"], "pending");
    assert_ne!(moved["id"], original["id"]);

    let old: Value = ctx
        .server
        .get(&format!("/appointments/{}", id(&original)))
        .acting_as(&pupil)
        .await
        .json();
    assert_eq!(old["status"], "cancelled");

    // target now full: the source slot must stay untouched
    let latecomer = student();
    let waiting: Value = ctx.book(&latecomer, &from["id"]).await.json();
    let blocked = ctx
        .server
        .put(&format!("/appointments/{}/reschedule", id(&waiting)))
        .acting_as(&latecomer)
        .json(&json!({"slot_id": to["id"]}))
        .await;
    assert_error(&blocked, StatusCode::CONFLICT, true);
    let source: Value = ctx
        .server
        .get(&format!("/slots/{}", id(&from)))
        .acting_as(&owner)
        .await
        .json();
    assert_eq!(source["booked_count"], 1);
}

#[tokio::test]
async fn test_appointment_views_are_scoped_to_caller() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let pupil = student();
    let monday = ctx.slot_on(&owner, "2025-03-10", "09:00", 3).await;
    let friday = ctx.slot_on(&owner, "2025-03-14", "09:00", 3).await;
    let foreign = ctx.slot_on(&lecturer(), "2025-03-10", "09:00", 3).await;
    let mine: Value = ctx.book(&pupil, &friday["id"]).await.json();
    ctx.book(&pupil, &monday["id"]).await.assert_status(StatusCode::CREATED);
    ctx.book(&student(), &monday["id"]).await.assert_status(StatusCode::CREATED);
    ctx.book(&pupil, &foreign["id"]).await.assert_status(StatusCode::CREATED);

    let student_view: Vec<Value> = ctx.server.get("/appointments").acting_as(&pupil).await.json();
    assert_eq!(student_view.len(), 3);
    assert!(student_view.iter().all(|a| a["student_id"] == pupil.id.to_string()));
    assert_eq!(student_view.last().unwrap()["id"], mine["id"]);
    assert_eq!(student_view.last().unwrap()["slot"]["date"], "2025-03-14");

    let lecturer_view: Vec<Value> = ctx
        .server
        .get("/appointments")
        .add_query_param("from", "2025-03-10")
        .add_query_param("to", "2025-03-12")
        .add_query_param("status", "pending")
        .acting_as(&owner)
        .await
        .json();
    assert_eq!(lecturer_view.len(), 2);
    assert!(lecturer_view.iter().all(|a| a["slot_id"] == monday["id"]));

    let bad_status = ctx
        .server
        .get("/appointments")
        .add_query_param("status", "booked")
        .acting_as(&owner)
        .await;
    assert_error(&bad_status, StatusCode::BAD_REQUEST, false);

    let peek = ctx
        .server
        .get(&format!("/appointments/{}", id(&mine)))
        .acting_as(&student())
        .await;
    assert_error(&peek, StatusCode::FORBIDDEN, false);
}

#[tokio::test]
async fn test_summary_counts_lecturer_bookings() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let slot = ctx.slot(&owner, 3).await;
    let first: Value = ctx.book(&student(), &slot["id"]).await.json();
    ctx.book(&student(), &slot["id"]).await.assert_status(StatusCode::CREATED);
    ctx.server
        .put(&format!("/appointments/{}/approve", id(&first)))
        .acting_as(&owner)
        .await
        .assert_status_ok();

    let summary: Value = ctx
        .server
        .get("/appointments/summary")
        .acting_as(&owner)
        .await
        .json();

    assert_eq!(summary["total"], 2);
    assert_eq!(summary["by_status"]["approved"], 1);
    assert_eq!(summary["by_status"]["pending"], 1);
    assert_eq!(summary["by_date"]["2025-03-10"], 2);
    assert!(summary["avg_response_hours"].is_number());
}

#[tokio::test]
async fn test_store_failure_is_service_unavailable() {
    let mut store = MockStore::new();
    store
        .expect_get_slot()
        .returning(|_| Err(eyre::eyre!("connection refused")));
    let ctx = TestContext::with_store(Arc::new(store));

    let response = ctx
        .server
        .get(&format!("/slots/{}", uuid::Uuid::new_v4()))
        .acting_as(&student())
        .await;

    let message = assert_error(&response, StatusCode::SERVICE_UNAVAILABLE, false);
    assert!(message.starts_with("Storage error"), "{message}");
}
