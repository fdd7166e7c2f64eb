//! HTTP-level tests for booking creation, visibility and status changes.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, get_auth, post_auth, post_json, post_json_auth, seed_therapist, seed_user,
    token_for,
};
use ledgerwell_db::models::booking_session::BookingFilter;
use ledgerwell_db::repositories::BookingSessionRepo;
use serde_json::json;
use sqlx::PgPool;

async fn booking_count(pool: &PgPool) -> usize {
    BookingSessionRepo::list(pool, &BookingFilter::default(), None, None)
        .await
        .unwrap()
        .len()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn employee_books_for_themselves(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let employee = seed_user(&pool, "employee_a", "employee").await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({
            "therapist_id": therapist_id,
            "session_date": "2030-05-06",
            "start": "15:00",
        }),
        &token_for(&employee),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["therapist_id"], therapist_id);
    assert_eq!(data["user_id"], employee.id);
    assert_eq!(data["client_email"], employee.email);
    assert_eq!(data["start_time"], "2030-05-06T15:00:00Z");
    // Therapist's default session length.
    assert_eq!(data["end_time"], "2030-05-06T15:50:00Z");
    assert_eq!(data["status_id"], 1);
    assert_eq!(data["session_type"], "paid");
    assert_eq!(data["source"], "manual");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_date_is_rejected_without_inserting(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let employee = seed_user(&pool, "employee_a", "employee").await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({ "therapist_id": therapist_id }),
        &token_for(&employee),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_therapist_is_rejected_without_inserting(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let employee = seed_user(&pool, "employee_a", "employee").await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({ "start_time": "2030-05-06T15:00:00Z" }),
        &token_for(&employee),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_therapist_returns_404(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let employee = seed_user(&pool, "employee_a", "employee").await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({ "therapist_id": 9999, "start_time": "2030-05-06T15:00:00Z" }),
        &token_for(&employee),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unauthenticated_booking_returns_401(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/bookings",
        json!({ "therapist_id": 1, "start_time": "2030-05-06T15:00:00Z" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn employee_cannot_book_for_another_user(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let employee = seed_user(&pool, "employee_a", "employee").await;
    let other = seed_user(&pool, "employee_b", "employee").await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({
            "therapist_id": therapist_id,
            "user_id": other.id,
            "start_time": "2030-05-06T15:00:00Z",
        }),
        &token_for(&employee),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn employer_admin_cannot_book_for_another_user(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let admin = seed_user(&pool, "admin_a", "employer_admin").await;
    let employee = seed_user(&pool, "employee_a", "employee").await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({
            "therapist_id": therapist_id,
            "user_id": employee.id,
            "start_time": "2030-05-06T15:00:00Z",
        }),
        &token_for(&admin),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(booking_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn therapist_cannot_book_on_another_therapists_calendar(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (therapist_a, own_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let (_, other_id) = seed_therapist(&pool, "therapist_b", 12_000).await;
    let client = seed_user(&pool, "employee_a", "employee").await;
    let token = token_for(&therapist_a);

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({
            "therapist_id": other_id,
            "user_id": client.id,
            "start_time": "2030-05-06T15:00:00Z",
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(booking_count(&pool).await, 0);

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({
            "therapist_id": own_id,
            "user_id": client.id,
            "start_time": "2030-05-06T15:00:00Z",
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["therapist_id"], own_id);
    assert_eq!(json["data"]["user_id"], client.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn therapist_books_unregistered_client_by_email(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (therapist_user, therapist_id) = seed_therapist(&pool, "therapist_a", 0).await;

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({
            "therapist_id": therapist_id,
            "client_email": "  New.Client@Example.com ",
            "start_time": "2030-05-06T15:00:00Z",
        }),
        &token_for(&therapist_user),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["client_email"], "new.client@example.com");
    assert!(json["data"]["user_id"].is_null());
    assert_eq!(json["data"]["session_type"], "free");
}

// ---------------------------------------------------------------------------
// Visibility and transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn confirm_then_cancel_follows_the_state_machine(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (therapist_user, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let employee = seed_user(&pool, "employee_a", "employee").await;
    let employee_token = token_for(&employee);
    let therapist_token = token_for(&therapist_user);

    let created = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({ "therapist_id": therapist_id, "start_time": "2030-05-06T15:00:00Z" }),
        &employee_token,
    )
    .await;
    let id = body_json(created).await["data"]["id"].as_i64().unwrap();

    // The client cannot confirm.
    let response = post_auth(
        harness.app(),
        &format!("/api/v1/bookings/{id}/confirm"),
        &employee_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(
        harness.app(),
        &format!("/api/v1/bookings/{id}/confirm"),
        &therapist_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status_id"], 2);

    let response = post_auth(
        harness.app(),
        &format!("/api/v1/bookings/{id}/cancel"),
        &employee_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], 4);
    assert!(json["data"]["cancelled_at"].is_string());

    // Cancelled is terminal.
    let response = post_auth(
        harness.app(),
        &format!("/api/v1/bookings/{id}/confirm"),
        &therapist_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bookings_are_scoped_to_participants(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (therapist_user, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let employee = seed_user(&pool, "employee_a", "employee").await;
    let outsider = seed_user(&pool, "employee_b", "employee").await;
    let admin = seed_user(&pool, "admin_a", "employer_admin").await;

    let created = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({ "therapist_id": therapist_id, "start_time": "2030-05-06T15:00:00Z" }),
        &token_for(&employee),
    )
    .await;
    let id = body_json(created).await["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/bookings/{id}");

    let response = get_auth(harness.app(), &uri, &token_for(&outsider)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    for user in [&employee, &therapist_user, &admin] {
        let response = get_auth(harness.app(), &uri, &token_for(user)).await;
        assert_eq!(response.status(), StatusCode::OK, "{} should see booking", user.role);
    }

    let response = get_auth(harness.app(), "/api/v1/bookings", &token_for(&outsider)).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let response = get_auth(harness.app(), "/api/v1/bookings", &token_for(&therapist_user)).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
