//! HTTP-level tests for the identity, scheduling and payment webhooks.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{
    body_json, post_raw, seed_therapist, seed_user, IDENTITY_WEBHOOK_SECRET,
    PAYMENTS_WEBHOOK_SECRET, SCHEDULING_WEBHOOK_SECRET,
};
use ledgerwell_core::hashing::hmac_sha256_hex;
use ledgerwell_core::subscription::{SubscriptionSnapshot, SubscriptionStatus};
use ledgerwell_db::models::booking_session::BookingFilter;
use ledgerwell_db::repositories::{BookingSessionRepo, TherapistRepo, UserRepo};
use ledgerwell_integrations::cache::SubscriptionCache;
use ledgerwell_integrations::payments::webhook::signature_header;
use serde_json::json;
use sqlx::PgPool;

fn scheduling_headers(body: &[u8]) -> Vec<(&'static str, String)> {
    vec![(
        "x-scheduling-signature",
        hmac_sha256_hex(SCHEDULING_WEBHOOK_SECRET.as_bytes(), body),
    )]
}

fn identity_headers(body: &[u8]) -> Vec<(&'static str, String)> {
    vec![(
        "x-identity-signature",
        hmac_sha256_hex(IDENTITY_WEBHOOK_SECRET.as_bytes(), body),
    )]
}

fn payment_headers(body: &[u8]) -> Vec<(&'static str, String)> {
    vec![(
        "stripe-signature",
        signature_header(PAYMENTS_WEBHOOK_SECRET, Utc::now().timestamp(), body),
    )]
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn scheduling_replay_returns_the_existing_booking(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let body = serde_json::to_vec(&json!({
        "event": "invitee.created",
        "payload": {
            "event_id": "evt_123",
            "therapist_id": therapist_id,
            "email": "Invitee@Example.com",
            "name": "Pat Invitee",
            "start_time": "2030-05-06T15:00:00Z",
            "join_url": "https://meet.example.com/abc",
        }
    }))
    .unwrap();

    let first = post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &body,
        &scheduling_headers(&body),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_json(first).await;
    assert_eq!(first["data"]["source"], "scheduler");
    assert_eq!(first["data"]["external_event_id"], "evt_123");
    assert_eq!(first["data"]["client_email"], "invitee@example.com");
    assert_eq!(first["data"]["metadata"]["join_url"], "https://meet.example.com/abc");

    let replay = post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &body,
        &scheduling_headers(&body),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::OK);
    let replay = body_json(replay).await;
    assert_eq!(replay["data"]["id"], first["data"]["id"]);

    let all = BookingSessionRepo::list(&pool, &BookingFilter::default(), None, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scheduling_rejects_bad_signature(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let body = serde_json::to_vec(&json!({
        "event": "invitee.created",
        "payload": { "therapist_id": therapist_id, "start_time": "2030-05-06T15:00:00Z" }
    }))
    .unwrap();

    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &body,
        &[("x-scheduling-signature", "deadbeef".to_string())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_raw(harness.app(), "/api/v1/webhooks/scheduling", &body, &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let all = BookingSessionRepo::list(&pool, &BookingFilter::default(), None, None)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scheduling_cancel_cancels_by_event_id(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let created = serde_json::to_vec(&json!({
        "event": "invitee.created",
        "payload": {
            "event_id": "evt_9",
            "therapist_id": therapist_id,
            "email": "client@example.com",
            "session_date": "2030-05-06",
            "start": "10:00",
        }
    }))
    .unwrap();
    post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &created,
        &scheduling_headers(&created),
    )
    .await;

    let canceled = serde_json::to_vec(&json!({
        "event": "invitee.canceled",
        "payload": { "event_id": "evt_9" }
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &canceled,
        &scheduling_headers(&canceled),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["data"]["status_id"], 4);

    // A repeated cancel reports the terminal row unchanged.
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &canceled,
        &scheduling_headers(&canceled),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_eq!(second["data"]["status_id"], 4);
    assert_eq!(second["data"]["cancelled_at"], first["data"]["cancelled_at"]);
    assert_eq!(second["data"]["updated_at"], first["data"]["updated_at"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scheduling_invalid_payload_is_rejected(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    let body = serde_json::to_vec(&json!({
        "event": "invitee.created",
        "payload": { "therapist_id": therapist_id, "email": "client@example.com" }
    }))
    .unwrap();

    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &body,
        &scheduling_headers(&body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn identity_user_created_links_earlier_bookings(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;

    let booking = serde_json::to_vec(&json!({
        "event": "invitee.created",
        "payload": {
            "event_id": "evt_1",
            "therapist_id": therapist_id,
            "email": "late.signup@example.com",
            "start_time": "2030-05-06T15:00:00Z",
        }
    }))
    .unwrap();
    post_raw(
        harness.app(),
        "/api/v1/webhooks/scheduling",
        &booking,
        &scheduling_headers(&booking),
    )
    .await;

    let body = serde_json::to_vec(&json!({
        "type": "user.created",
        "data": {
            "id": "user_late",
            "email_addresses": [{ "email_address": "Late.Signup@example.com" }],
            "first_name": "Late",
            "public_metadata": { "role": "employee" },
        }
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/identity",
        &body,
        &identity_headers(&body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = UserRepo::find_by_external_id(&pool, "user_late")
        .await
        .unwrap()
        .expect("user should be upserted");
    assert_eq!(user.email, "late.signup@example.com");

    let session = BookingSessionRepo::find_by_external_event_id(&pool, "evt_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.user_id, Some(user.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn identity_update_keeps_role_when_metadata_has_none(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    seed_user(&pool, "user_t", "therapist").await;

    let body = serde_json::to_vec(&json!({
        "type": "user.updated",
        "data": { "id": "user_t", "email": "user_t@example.com", "last_name": "Ledger" }
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/identity",
        &body,
        &identity_headers(&body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = UserRepo::find_by_external_id(&pool, "user_t")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, "therapist");
    assert_eq!(user.last_name.as_deref(), Some("Ledger"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn identity_user_deleted_deactivates(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    seed_user(&pool, "user_gone", "employee").await;

    let body = serde_json::to_vec(&json!({
        "type": "user.deleted",
        "data": { "id": "user_gone" }
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/identity",
        &body,
        &identity_headers(&body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["action"], "deactivated");

    let user = UserRepo::find_by_external_id(&pool, "user_gone")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_active);
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_account_update_syncs_payout_flags(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let (_, therapist_id) = seed_therapist(&pool, "therapist_a", 12_000).await;
    TherapistRepo::set_payment_account(&pool, therapist_id, "acct_77")
        .await
        .unwrap();

    let body = serde_json::to_vec(&json!({
        "id": "evt_pay_1",
        "type": "account.updated",
        "data": { "object": {
            "id": "acct_77",
            "charges_enabled": true,
            "payouts_enabled": true,
            "details_submitted": true,
        }}
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/payments",
        &body,
        &payment_headers(&body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let therapist = TherapistRepo::find_by_id(&pool, therapist_id)
        .await
        .unwrap()
        .unwrap();
    assert!(therapist.charges_enabled);
    assert!(therapist.payouts_enabled);
    assert!(therapist.details_submitted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_subscription_event_refreshes_cache(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    harness.payments.set_subscription(SubscriptionSnapshot {
        subscription_id: Some("sub_5".to_string()),
        status: SubscriptionStatus::PastDue,
        ..SubscriptionSnapshot::empty("cus_5", Utc::now())
    });

    let body = serde_json::to_vec(&json!({
        "id": "evt_pay_2",
        "type": "customer.subscription.updated",
        "data": { "object": { "id": "sub_5", "customer": "cus_5" } }
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/payments",
        &body,
        &payment_headers(&body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cached = harness.cache.get("cus_5").await.unwrap().unwrap();
    assert_eq!(cached.status, SubscriptionStatus::PastDue);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_subscription_refresh_evicts_cached_snapshot(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    harness
        .cache
        .put(&SubscriptionSnapshot {
            subscription_id: Some("sub_6".to_string()),
            status: SubscriptionStatus::Active,
            ..SubscriptionSnapshot::empty("cus_6", Utc::now())
        })
        .await
        .unwrap();
    harness.payments.set_subscriptions_unavailable(true);

    let body = serde_json::to_vec(&json!({
        "id": "evt_pay_3",
        "type": "customer.subscription.deleted",
        "data": { "object": { "id": "sub_6", "customer": "cus_6" } }
    }))
    .unwrap();
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/payments",
        &body,
        &payment_headers(&body),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(harness.cache.get("cus_6").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_webhook_rejects_stale_or_forged_signatures(pool: PgPool) {
    let harness = common::build_harness(pool.clone());
    let body = br#"{"id":"evt_3","type":"invoice.paid","data":{"object":{}}}"#;

    let stale = signature_header(PAYMENTS_WEBHOOK_SECRET, Utc::now().timestamp() - 3600, body);
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/payments",
        body,
        &[("stripe-signature", stale)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = signature_header("whsec_other", Utc::now().timestamp(), body);
    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/payments",
        body,
        &[("stripe-signature", forged)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_raw(
        harness.app(),
        "/api/v1/webhooks/payments",
        body,
        &payment_headers(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["action"], "ignored");
}
