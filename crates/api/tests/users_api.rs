//! HTTP-level tests for session auth, provisioning and onboarding.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, get_auth, post_auth, post_json_auth, put_json_auth, seed_therapist, seed_user,
    token_for, JWT_SECRET,
};
use ledgerwell_api::auth::session::{issue_session_token, IdentityClaims};
use ledgerwell_db::repositories::UserRepo;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_request_provisions_the_user(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let claims = IdentityClaims::new(
        "user_new",
        Some("New.Person@Example.com".to_string()),
        Some("therapist".to_string()),
        3600,
    );
    let token = issue_session_token(&claims, JWT_SECRET).unwrap();

    let response = get_auth(harness.app(), "/api/v1/users/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["external_id"], "user_new");
    assert_eq!(json["data"]["email"], "new.person@example.com");
    assert_eq!(json["data"]["role"], "therapist");

    // The second request reuses the row.
    get_auth(harness.app(), "/api/v1/users/me", &token).await;
    let user = UserRepo::find_by_external_id(&pool, "user_new")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(json["data"]["id"], user.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tokens_signed_with_another_secret_are_rejected(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let claims = IdentityClaims::new("user_x", Some("x@example.com".into()), None, 3600);
    let token = issue_session_token(&claims, "not-the-secret").unwrap();

    let response = get_auth(harness.app(), "/api/v1/users/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_users_are_forbidden(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let user = seed_user(&pool, "user_off", "employee").await;
    UserRepo::deactivate_by_external_id(&pool, "user_off")
        .await
        .unwrap();

    let response = get_auth(harness.app(), "/api/v1/users/me", &token_for(&user)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_is_locked_after_onboarding(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let user = seed_user(&pool, "user_a", "employee").await;
    let token = token_for(&user);

    let response = put_json_auth(
        harness.app(),
        "/api/v1/users/me/role",
        json!({ "role": "wizard" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        harness.app(),
        "/api/v1/users/me/role",
        json!({ "role": "therapist" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["role"], "therapist");

    let response = post_auth(harness.app(), "/api/v1/users/me/onboarding", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["onboarding_complete"], true);

    let metadata = harness
        .identity
        .metadata_for("user_a")
        .expect("metadata should be synced");
    assert_eq!(metadata["role"], "therapist");
    assert_eq!(metadata["onboarding_complete"], true);

    let response = put_json_auth(
        harness.app(),
        "/api/v1/users/me/role",
        json!({ "role": "employee" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn employer_admin_cannot_be_self_assigned(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let employee = seed_user(&pool, "employee_a", "employee").await;
    let victim = seed_user(&pool, "employee_b", "employee").await;
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let token = token_for(&employee);

    let response = post_json_auth(
        harness.app(),
        "/api/v1/bookings",
        json!({ "therapist_id": therapist_id, "start_time": "2030-05-06T15:00:00Z" }),
        &token_for(&victim),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = put_json_auth(
        harness.app(),
        "/api/v1/users/me/role",
        json!({ "role": "employer_admin" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = UserRepo::find_by_id(&pool, employee.id).await.unwrap().unwrap();
    assert_eq!(stored.role, "employee");

    let response = get_auth(harness.app(), "/api/v1/bookings", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}
