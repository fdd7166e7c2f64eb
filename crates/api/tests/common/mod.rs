#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use ledgerwell_api::auth::session::{issue_session_token, IdentityClaims};
use ledgerwell_api::config::{CacheConfig, IdentityConfig, PaymentsConfig, ServerConfig};
use ledgerwell_api::router::build_app_router;
use ledgerwell_api::state::AppState;
use ledgerwell_core::types::DbId;
use ledgerwell_db::models::therapist::CreateTherapist;
use ledgerwell_db::models::user::{CreateUser, User};
use ledgerwell_db::repositories::{TherapistRepo, UserRepo};
use ledgerwell_events::EventBus;
use ledgerwell_integrations::cache::MemorySubscriptionCache;
use ledgerwell_integrations::calendar::MemoryCalendarProvider;
use ledgerwell_integrations::identity::MemoryIdentityProvider;
use ledgerwell_integrations::payments::memory::MemoryPaymentProcessor;
use ledgerwell_integrations::storage::MemoryStorage;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const CRON_SECRET: &str = "test-cron-secret";
pub const IDENTITY_WEBHOOK_SECRET: &str = "test-identity-webhook-secret";
pub const SCHEDULING_WEBHOOK_SECRET: &str = "test-scheduling-webhook-secret";
pub const PAYMENTS_WEBHOOK_SECRET: &str = "whsec_test";

/// Build a test `ServerConfig` with fixed secrets and no external services.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        app_base_url: "http://localhost:5173".to_string(),
        cron_secret: CRON_SECRET.to_string(),
        session_completion_interval_secs: 0,
        scheduling_webhook_secret: SCHEDULING_WEBHOOK_SECRET.to_string(),
        s3_bucket: None,
        identity: IdentityConfig {
            jwt_secret: JWT_SECRET.to_string(),
            api_url: "http://identity.invalid".to_string(),
            secret_key: None,
            webhook_secret: IDENTITY_WEBHOOK_SECRET.to_string(),
        },
        payments: PaymentsConfig {
            api_url: "http://payments.invalid".to_string(),
            secret_key: None,
            webhook_secret: PAYMENTS_WEBHOOK_SECRET.to_string(),
            currency: "usd".to_string(),
        },
        cache: CacheConfig {
            redis_url: None,
            ttl_secs: 3600,
        },
        calendar: None,
    }
}

/// The application plus handles to the in-memory integration doubles, so
/// tests can arrange provider state and inspect what was sent.
pub struct TestHarness {
    pub app: Router,
    pub state: AppState,
    pub payments: Arc<MemoryPaymentProcessor>,
    pub cache: Arc<MemorySubscriptionCache>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub calendar: Arc<MemoryCalendarProvider>,
    pub storage: Arc<MemoryStorage>,
}

impl TestHarness {
    /// A fresh handle to the router; `oneshot` consumes it.
    pub fn app(&self) -> Router {
        self.app.clone()
    }
}

/// Build the full application, with the production middleware stack, over
/// in-memory integrations.
pub fn build_harness(pool: PgPool) -> TestHarness {
    let config = test_config();

    let payments = Arc::new(MemoryPaymentProcessor::new());
    let cache = Arc::new(MemorySubscriptionCache::new(config.cache.ttl_secs));
    let identity = Arc::new(MemoryIdentityProvider::new());
    let calendar = Arc::new(MemoryCalendarProvider::new());
    let storage = Arc::new(MemoryStorage::new());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
        payments: payments.clone(),
        subscription_cache: cache.clone(),
        identity: identity.clone(),
        calendar: calendar.clone(),
        storage: storage.clone(),
    };

    TestHarness {
        app: build_app_router(state.clone(), &config),
        state,
        payments,
        cache,
        identity,
        calendar,
        storage,
    }
}

/// Build the full application router for tests that need no doubles.
pub fn build_test_app(pool: PgPool) -> Router {
    build_harness(pool).app
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Insert a user with a deterministic email derived from `external_id`.
pub async fn seed_user(pool: &PgPool, external_id: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            external_id: external_id.to_string(),
            email: format!("{external_id}@example.com"),
            first_name: None,
            last_name: None,
            role: role.to_string(),
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Insert a therapist user and profile, returning `(user, therapist_id)`.
pub async fn seed_therapist(pool: &PgPool, external_id: &str, rate_cents: i64) -> (User, DbId) {
    let user = seed_user(pool, external_id, "therapist").await;
    let therapist = TherapistRepo::create(
        pool,
        user.id,
        &CreateTherapist {
            display_name: format!("Dr. {external_id}"),
            bio: None,
            hourly_rate_cents: Some(rate_cents),
            currency: None,
            session_length_minutes: Some(50),
            timezone: None,
            scheduling_url: None,
        },
    )
    .await
    .expect("therapist creation should succeed");
    (user, therapist.id)
}

/// Mint a session token for an existing user.
pub fn token_for(user: &User) -> String {
    let claims = IdentityClaims::new(
        user.external_id.clone(),
        Some(user.email.clone()),
        Some(user.role.clone()),
        3600,
    );
    issue_session_token(&claims, JWT_SECRET).expect("token signing should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("request should complete")
}

fn json_request(
    method: Method,
    uri: &str,
    body: &serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, bare_request(Method::GET, uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, bare_request(Method::GET, uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request(Method::POST, uri, &body, None)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request(Method::POST, uri, &body, Some(token))).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, bare_request(Method::POST, uri, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request(Method::PUT, uri, &body, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, bare_request(Method::DELETE, uri, Some(token))).await
}

/// POST a raw body with extra headers, as webhook senders do.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: &[u8],
    headers: &[(&str, String)],
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    let request = builder
        .body(Body::from(body.to_vec()))
        .expect("request should build");
    send(app, request).await
}
