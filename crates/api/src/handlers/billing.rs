//! Handlers for employer billing: processor customers and the cached
//! subscription snapshot.
//!
//! The processor is the source of truth. Every sync fetches the canonical
//! subscription and writes it through to the cache; reads are served from the
//! cache and fall back to a sync on a miss.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use ledgerwell_core::error::CoreError;
use ledgerwell_core::subscription::SubscriptionSnapshot;
use ledgerwell_db::models::user::User;
use ledgerwell_db::repositories::UserRepo;
use ledgerwell_events::{event_types, PlatformEvent};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for `POST /billing/customer`.
#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub customer_id: String,
}

/// A subscription snapshot as returned to the client.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub snapshot: SubscriptionSnapshot,
    /// Whether the status unlocks paid employer features.
    pub has_access: bool,
    /// `true` when served from the cache without contacting the processor.
    pub cached: bool,
}

impl SubscriptionView {
    fn new(snapshot: SubscriptionSnapshot, cached: bool) -> Self {
        Self {
            has_access: snapshot.status.grants_access(),
            snapshot,
            cached,
        }
    }
}

/// POST /billing/customer
///
/// Create a processor customer for the caller unless one exists.
pub async fn create_customer(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = load_user(&state, &auth).await?;
    if let Some(customer_id) = user.payment_customer_id {
        return Ok((
            StatusCode::OK,
            Json(DataResponse {
                data: CustomerResponse { customer_id },
            }),
        ));
    }

    let name = match (user.first_name.as_deref(), user.last_name.as_deref()) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_string()),
        (None, Some(last)) => Some(last.to_string()),
        (None, None) => None,
    };
    let customer_id = state
        .payments
        .create_customer(&user.email, name.as_deref(), user.id)
        .await?;
    UserRepo::set_payment_customer_id(&state.pool, user.id, &customer_id).await?;

    tracing::info!(
        user_id = user.id,
        payment_customer_id = %customer_id,
        "Payment customer created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CustomerResponse { customer_id },
        }),
    ))
}

/// POST /billing/sync
///
/// Fetch the caller's subscription from the processor and refresh the cache.
pub async fn sync(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let customer_id = require_customer(&state, &auth).await?;
    let snapshot = sync_subscription(&state, &customer_id).await?;
    Ok(Json(DataResponse {
        data: SubscriptionView::new(snapshot, false),
    }))
}

/// GET /billing/subscription
///
/// Read-through: cached snapshot when present, otherwise a fresh sync.
pub async fn get_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let customer_id = require_customer(&state, &auth).await?;

    match state.subscription_cache.get(&customer_id).await {
        Ok(Some(snapshot)) => {
            return Ok(Json(DataResponse {
                data: SubscriptionView::new(snapshot, true),
            }));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                payment_customer_id = %customer_id,
                error = %e,
                "Subscription cache read failed, syncing from processor"
            );
        }
    }

    let snapshot = sync_subscription(&state, &customer_id).await?;
    Ok(Json(DataResponse {
        data: SubscriptionView::new(snapshot, false),
    }))
}

/// Fetch the canonical subscription for `customer_id` and write it through
/// to the cache.
pub(crate) async fn sync_subscription(
    state: &AppState,
    customer_id: &str,
) -> AppResult<SubscriptionSnapshot> {
    let snapshot = state.payments.fetch_subscription(customer_id).await?;
    state.subscription_cache.put(&snapshot).await?;

    state.event_bus.publish(
        PlatformEvent::new(event_types::SUBSCRIPTION_SYNCED).with_payload(serde_json::json!({
            "customer_id": snapshot.customer_id,
            "status": snapshot.status.as_str(),
        })),
    );

    tracing::info!(
        payment_customer_id = %customer_id,
        status = snapshot.status.as_str(),
        "Subscription synced"
    );

    Ok(snapshot)
}

async fn load_user(state: &AppState, auth: &AuthUser) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))
}

async fn require_customer(state: &AppState, auth: &AuthUser) -> AppResult<String> {
    load_user(state, auth)
        .await?
        .payment_customer_id
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "No payment customer exists for this user".into(),
            ))
        })
}
