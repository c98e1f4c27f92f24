use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

use crate::test_utils::{ActingAs, TestContext, assert_error, lecturer, student};

#[tokio::test]
async fn test_create_slot_returns_created_slot() {
    let ctx = TestContext::new();
    let owner = lecturer();

    let slot = ctx.slot(&owner, 3).await;

    assert_eq!(slot["owner_id"], owner.id.to_string());
    assert_eq!(slot["location"], "Room 4.12");
    assert_eq!(slot["date"], "2025-03-10");
    assert_eq!(slot["start_time"], "09:00:00");
    assert_eq!(slot["capacity"], 3);
    assert_eq!(slot["booked_count"], 0);
    assert_eq!(slot["status"], "available");
}

#[tokio::test]
async fn test_create_slot_requires_identity() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/slots")
        .json(&json!({
            "location": "Room 1",
            "date": "2025-03-10",
            "start_time": "09:00",
            "end_time": "10:00",
        }))
        .await;

    assert_error(&response, StatusCode::UNAUTHORIZED, false);
}

#[tokio::test]
async fn test_malformed_identity_headers_are_rejected() {
    let ctx = TestContext::new();

    let bad_id = ctx
        .server
        .get("/slots")
        .add_header("x-principal-id".parse().unwrap(), "42".parse().unwrap())
        .add_header("x-principal-role".parse().unwrap(), "lecturer".parse().unwrap())
        .await;
    assert_error(&bad_id, StatusCode::UNAUTHORIZED, false);

    let bad_role = ctx
        .server
        .get("/slots")
        .add_header(
            "x-principal-id".parse().unwrap(),
            uuid::Uuid::new_v4().to_string().parse().unwrap(),
        )
        .add_header("x-principal-role".parse().unwrap(), "admin".parse().unwrap())
        .await;
    assert_error(&bad_role, StatusCode::UNAUTHORIZED, false);
}

#[tokio::test]
async fn test_students_cannot_create_slots() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/slots")
        .acting_as(&student())
        .json(&json!({
            "location": "Room 1",
            "date": "2025-03-10",
            "start_time": "09:00",
            "end_time": "10:00",
        }))
        .await;

    assert_error(&response, StatusCode::FORBIDDEN, false);
}

#[rstest]
#[case::inverted_times(json!({"location": "A", "date": "2025-03-10", "start_time": "11:00", "end_time": "10:00"}))]
#[case::zero_capacity(json!({"location": "A", "date": "2025-03-10", "start_time": "09:00", "end_time": "10:00", "capacity": 0}))]
#[case::bad_date(json!({"location": "A", "date": "2025-02-30", "start_time": "09:00", "end_time": "10:00"}))]
#[case::missing_location(json!({"date": "2025-03-10", "start_time": "09:00", "end_time": "10:00"}))]
#[case::unknown_field(json!({"location": "A", "date": "2025-03-10", "start_time": "09:00", "end_time": "10:00", "booked_count": 4}))]
#[tokio::test]
async fn test_invalid_slot_bodies_are_bad_requests(#[case] body: Value) {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/slots")
        .acting_as(&lecturer())
        .json(&body)
        .await;

    assert_error(&response, StatusCode::BAD_REQUEST, false);
}

#[tokio::test]
async fn test_get_missing_slot_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get(&format!("/slots/{}", uuid::Uuid::new_v4()))
        .acting_as(&student())
        .await;

    assert_error(&response, StatusCode::NOT_FOUND, false);
}

#[tokio::test]
async fn test_list_slots_applies_query_filters() {
    let ctx = TestContext::new();
    let alice = lecturer();
    let bob = lecturer();
    let tuesday = ctx.slot_on(&alice, "2025-03-11", "09:00", 1).await;
    let monday = ctx.slot_on(&alice, "2025-03-10", "09:00", 1).await;
    ctx.slot_on(&bob, "2025-03-10", "09:00", 1).await;
    ctx.book(&student(), &monday["id"]).await.assert_status(StatusCode::CREATED);

    let mine: Vec<Value> = ctx
        .server
        .get("/slots")
        .add_query_param("owner_id", alice.id)
        .acting_as(&student())
        .await
        .json();
    let ids: Vec<_> = mine.iter().map(|s| s["id"].clone()).collect();
    assert_eq!(ids, vec![monday["id"].clone(), tuesday["id"].clone()]);
    assert_eq!(mine[0]["status"], "full");

    let open: Vec<Value> = ctx
        .server
        .get("/slots")
        .add_query_param("owner_id", alice.id)
        .add_query_param("available", true)
        .acting_as(&student())
        .await
        .json();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["id"], tuesday["id"]);

    let bad_range = ctx
        .server
        .get("/slots")
        .add_query_param("from", "2025-03-12")
        .add_query_param("to", "2025-03-10")
        .acting_as(&student())
        .await;
    assert_error(&bad_range, StatusCode::BAD_REQUEST, false);
}

#[tokio::test]
async fn test_update_slot_by_owner_only() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let slot = ctx.slot(&owner, 2).await;
    let path = format!("/slots/{}", slot["id"].as_str().unwrap());

    let foreign = ctx
        .server
        .put(&path)
        .acting_as(&lecturer())
        .json(&json!({"location": "Lab 2"}))
        .await;
    assert_error(&foreign, StatusCode::FORBIDDEN, false);

    let empty = ctx.server.put(&path).acting_as(&owner).json(&json!({})).await;
    assert_error(&empty, StatusCode::BAD_REQUEST, false);

    let updated = ctx
        .server
        .put(&path)
        .acting_as(&owner)
        .json(&json!({"location": "Lab 2", "capacity": 4}))
        .await;
    updated.assert_status_ok();
    let body: Value = updated.json();
    assert_eq!(body["location"], "Lab 2");
    assert_eq!(body["capacity"], 4);
    assert_eq!(body["start_time"], slot["start_time"]);
}

#[tokio::test]
async fn test_capacity_below_bookings_is_conflict() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let slot = ctx.slot(&owner, 2).await;
    ctx.book(&student(), &slot["id"]).await.assert_status(StatusCode::CREATED);
    ctx.book(&student(), &slot["id"]).await.assert_status(StatusCode::CREATED);

    let response = ctx
        .server
        .put(&format!("/slots/{}", slot["id"].as_str().unwrap()))
        .acting_as(&owner)
        .json(&json!({"capacity": 1}))
        .await;

    let message = assert_error(&response, StatusCode::CONFLICT, false);
    assert!(message.contains("below"), "{message}");
}

#[tokio::test]
async fn test_delete_slot_lifecycle() {
    let ctx = TestContext::new();
    let owner = lecturer();
    let pupil = student();
    let slot = ctx.slot(&owner, 1).await;
    let path = format!("/slots/{}", slot["id"].as_str().unwrap());
    let appointment: Value = ctx.book(&pupil, &slot["id"]).await.json();

    let booked = ctx.server.delete(&path).acting_as(&owner).await;
    assert_error(&booked, StatusCode::CONFLICT, false);

    ctx.server
        .put(&format!(
            "/appointments/{}/cancel",
            appointment["id"].as_str().unwrap()
        ))
        .acting_as(&pupil)
        .await
        .assert_status_ok();

    let deleted = ctx.server.delete(&path).acting_as(&owner).await;
    deleted.assert_status(StatusCode::NO_CONTENT);

    let gone = ctx.server.get(&path).acting_as(&owner).await;
    assert_error(&gone, StatusCode::NOT_FOUND, false);
}

#[rstest]
#[case::slot("/slots/not-a-uuid")]
#[case::appointment("/appointments/42")]
#[tokio::test]
async fn test_malformed_path_id_is_json_bad_request(#[case] path: &str) {
    let ctx = TestContext::new();

    let response = ctx.server.get(path).acting_as(&lecturer()).await;

    assert_error(&response, StatusCode::BAD_REQUEST, false);
}
