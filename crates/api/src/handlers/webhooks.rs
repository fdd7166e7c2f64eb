//! Inbound webhooks from the identity provider, the scheduling widget and
//! the payment processor.
//!
//! Every handler verifies the signature against the raw body before parsing
//! it. Unknown event types are acknowledged so providers stop retrying them.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ledgerwell_core::booking::state_machine::is_terminal;
use ledgerwell_core::error::CoreError;
use ledgerwell_core::roles::{is_known_role, DEFAULT_ROLE};
use ledgerwell_core::validation::normalize_email;
use ledgerwell_db::models::status::BookingStatus;
use ledgerwell_db::models::therapist::PayoutCapabilities;
use ledgerwell_db::models::user::CreateUser;
use ledgerwell_db::repositories::{BookingSessionRepo, TherapistRepo, UserRepo};
use ledgerwell_events::{event_types, PlatformEvent};
use ledgerwell_integrations::payments::webhook::{
    self as payment_webhook, PaymentEventKind, PaymentWebhookEvent,
};
use ledgerwell_integrations::scheduling::{
    self, SchedulingCallback, EVENT_INVITEE_CANCELED, EVENT_INVITEE_CREATED,
};

use crate::auth::signature::require_hmac_signature;
use crate::engine::booking::{create_booking, BookingOrigin, BookingRequest};
use crate::error::{AppError, AppResult};
use crate::handlers::billing::sync_subscription;
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying the identity provider's body signature.
pub const IDENTITY_SIGNATURE_HEADER: &str = "x-identity-signature";

/// Acknowledgement body for processed webhooks.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub event_type: String,
    /// What the marketplace did with the event.
    pub action: &'static str,
}

fn ack(event_type: impl Into<String>, action: &'static str) -> Json<DataResponse<WebhookAck>> {
    Json(DataResponse {
        data: WebhookAck {
            event_type: event_type.into(),
            action,
        },
    })
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid payload: {e}")))
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IdentityWebhook {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: IdentityUserData,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdentityUserData {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<IdentityEmailAddress>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub public_metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct IdentityEmailAddress {
    pub email_address: String,
}

impl IdentityUserData {
    fn primary_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or_else(|| self.email_addresses.first().map(|e| e.email_address.as_str()))
    }

    fn metadata_role(&self) -> Option<&str> {
        self.public_metadata
            .get("role")
            .and_then(|r| r.as_str())
            .filter(|r| is_known_role(r))
    }
}

/// POST /webhooks/identity
///
/// `user.created` / `user.updated` upsert the local user; `user.deleted`
/// deactivates it.
pub async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    require_hmac_signature(
        &headers,
        IDENTITY_SIGNATURE_HEADER,
        &state.config.identity.webhook_secret,
        &body,
    )?;
    let event: IdentityWebhook = parse_body(&body)?;
    let data = &event.data;

    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let email = data.primary_email().ok_or_else(|| {
                AppError::Core(CoreError::Validation("user has no email address".into()))
            })?;
            let email = normalize_email(email)?;

            let existing = UserRepo::find_by_external_id(&state.pool, &data.id).await?;
            let role = match (data.metadata_role(), &existing) {
                (Some(role), _) => role.to_string(),
                (None, Some(user)) => user.role.clone(),
                (None, None) => DEFAULT_ROLE.to_string(),
            };

            let user = UserRepo::upsert_by_external_id(
                &state.pool,
                &CreateUser {
                    external_id: data.id.clone(),
                    email,
                    first_name: data.first_name.clone(),
                    last_name: data.last_name.clone(),
                    role,
                },
            )
            .await?;
            let linked =
                BookingSessionRepo::link_email_to_user(&state.pool, &user.email, user.id).await?;

            tracing::info!(
                user_id = user.id,
                external_id = %user.external_id,
                event_type = %event.event_type,
                linked_bookings = linked,
                "Identity webhook: user upserted"
            );
            Ok(ack(event.event_type, "upserted"))
        }
        "user.deleted" => {
            let deactivated = UserRepo::deactivate_by_external_id(&state.pool, &data.id).await?;
            tracing::info!(
                external_id = %data.id,
                deactivated,
                "Identity webhook: user deleted"
            );
            Ok(ack(event.event_type, if deactivated { "deactivated" } else { "ignored" }))
        }
        other => {
            tracing::debug!(event_type = %other, "Identity webhook: ignoring event");
            Ok(ack(event.event_type, "ignored"))
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduling widget
// ---------------------------------------------------------------------------

/// POST /webhooks/scheduling
///
/// `invitee.created` books a session (201, or 200 with the existing row on
/// replay); `invitee.canceled` cancels the matching session.
pub async fn scheduling(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    require_hmac_signature(
        &headers,
        scheduling::SIGNATURE_HEADER,
        &state.config.scheduling_webhook_secret,
        &body,
    )?;
    let callback: SchedulingCallback = parse_body(&body)?;
    let invitee = callback.payload;

    match callback.event.as_str() {
        EVENT_INVITEE_CREATED => {
            let mut metadata = serde_json::Map::new();
            if let Some(name) = &invitee.name {
                metadata.insert("invitee_name".into(), name.clone().into());
            }
            if let Some(url) = &invitee.join_url {
                metadata.insert("join_url".into(), url.clone().into());
            }

            let request = BookingRequest {
                therapist_id: invitee.therapist_id,
                user_id: None,
                client_email: invitee.email,
                start_time: invitee.start_time,
                session_date: invitee.session_date,
                start: invitee.start,
                end_time: invitee.end_time,
                session_type: invitee.session_type,
                metadata: Some(serde_json::Value::Object(metadata)),
            };
            let outcome = create_booking(
                &state,
                request,
                BookingOrigin::Scheduler {
                    external_event_id: invitee.event_id,
                },
            )
            .await?;

            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            Ok((
                status,
                Json(DataResponse {
                    data: outcome.session,
                }),
            )
                .into_response())
        }
        EVENT_INVITEE_CANCELED => {
            let Some(event_id) = invitee.event_id.as_deref() else {
                return Err(AppError::Core(CoreError::Validation(
                    "event_id is required to cancel a booking".into(),
                )));
            };
            let Some(session) =
                BookingSessionRepo::find_by_external_event_id(&state.pool, event_id).await?
            else {
                tracing::debug!(
                    external_event_id = %event_id,
                    "Scheduling cancel for unknown event"
                );
                return Ok(ack(callback.event, "ignored").into_response());
            };
            if is_terminal(session.status_id) {
                return Ok(Json(DataResponse { data: session }).into_response());
            }

            let cancelled = BookingSessionRepo::transition(
                &state.pool,
                session.id,
                &[BookingStatus::Scheduled.id(), BookingStatus::Confirmed.id()],
                BookingStatus::Cancelled,
            )
            .await?;

            match cancelled {
                Some(updated) => {
                    state.event_bus.publish(
                        PlatformEvent::new(event_types::BOOKING_CANCELLED)
                            .with_source("booking_session", updated.id)
                            .with_payload(serde_json::json!({ "source": "scheduler" })),
                    );
                    tracing::info!(
                        booking_session_id = updated.id,
                        external_event_id = %event_id,
                        "Booking cancelled by scheduling widget"
                    );
                    Ok(Json(DataResponse { data: updated }).into_response())
                }
                // Completed or cancelled concurrently; report the row as it stands.
                None => Ok(Json(DataResponse { data: session }).into_response()),
            }
        }
        _ => {
            tracing::debug!(event = %callback.event, "Scheduling webhook: ignoring event");
            Ok(ack(callback.event, "ignored").into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Payment processor
// ---------------------------------------------------------------------------

/// POST /webhooks/payments
///
/// Subscription events refresh the cached snapshot; `account.updated` syncs
/// therapist payout flags.
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let header = headers
        .get(payment_webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing webhook signature".into()))
        })?;

    payment_webhook::verify_signature(
        &state.config.payments.webhook_secret,
        header,
        &body,
        Utc::now().timestamp(),
        payment_webhook::DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| AppError::Core(CoreError::Unauthorized(e.to_string())))?;

    let event = PaymentWebhookEvent::parse(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid payload: {e}")))?;

    match event.kind {
        PaymentEventKind::SubscriptionChanged { customer_id } => {
            if let Err(e) = sync_subscription(&state, &customer_id).await {
                // The cached snapshot is now known to be stale.
                if let Err(cache_err) = state.subscription_cache.invalidate(&customer_id).await {
                    tracing::warn!(
                        payment_customer_id = %customer_id,
                        error = %cache_err,
                        "Failed to invalidate cached subscription"
                    );
                }
                return Err(e);
            }
            Ok(ack(event.event_type, "subscription_synced"))
        }
        PaymentEventKind::AccountUpdated {
            account_id,
            capabilities,
        } => {
            let Some(therapist) =
                TherapistRepo::find_by_payment_account_id(&state.pool, &account_id).await?
            else {
                tracing::debug!(
                    payment_account_id = %account_id,
                    "Payments webhook: account not linked to a therapist"
                );
                return Ok(ack(event.event_type, "ignored"));
            };

            TherapistRepo::update_payout_capabilities(
                &state.pool,
                therapist.id,
                PayoutCapabilities {
                    charges_enabled: capabilities.charges_enabled,
                    payouts_enabled: capabilities.payouts_enabled,
                    details_submitted: capabilities.details_submitted,
                },
            )
            .await?;

            tracing::info!(
                therapist_id = therapist.id,
                payment_account_id = %account_id,
                payouts_enabled = capabilities.payouts_enabled,
                "Payments webhook: payout capabilities updated"
            );
            Ok(ack(event.event_type, "account_updated"))
        }
        PaymentEventKind::Ignored => {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Payments webhook: ignoring event"
            );
            Ok(ack(event.event_type, "ignored"))
        }
    }
}
