//! Handlers for therapist profiles, payout onboarding, calendar connection,
//! availability and bookable slots.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ledgerwell_core::availability::{
    compute_slots, validate_range, validate_windows, Interval, WeeklyWindow,
};
use ledgerwell_core::error::CoreError;
use ledgerwell_core::types::{DbId, Timestamp};
use ledgerwell_db::models::therapist::{
    CalendarCredentials, CreateTherapist, PayoutCapabilities, Therapist, TherapistResponse,
    UpdateTherapist, CALENDAR_CONNECTED, CALENDAR_ERROR,
};
use ledgerwell_db::repositories::{AvailabilityRepo, BookingSessionRepo, TherapistRepo};
use ledgerwell_events::{event_types, PlatformEvent};
use ledgerwell_integrations::calendar::CalendarTokens;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTherapist;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Response for `POST /therapists/me/payments/connect`.
#[derive(Debug, Serialize)]
pub struct PaymentOnboarding {
    pub account_id: String,
    pub onboarding_url: String,
}

/// Request body for `POST /therapists/me/calendar/connect`.
#[derive(Debug, Deserialize)]
pub struct CalendarConnectRequest {
    pub code: String,
}

/// Request body for `PUT /therapists/me/availability`.
#[derive(Debug, Deserialize)]
pub struct ReplaceAvailability {
    pub windows: Vec<WeeklyWindow>,
}

/// Query parameters for `GET /therapists/{id}/slots`.
#[derive(Debug, Deserialize)]
pub struct SlotParams {
    pub from: Timestamp,
    pub to: Timestamp,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// POST /therapists
///
/// Create the caller's therapist profile.
pub async fn create_profile(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<CreateTherapist>,
) -> AppResult<impl IntoResponse> {
    if input.display_name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "display_name must not be empty".into(),
        )));
    }
    validate_pricing(input.hourly_rate_cents, input.session_length_minutes)?;

    let therapist = TherapistRepo::create(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        therapist_id = therapist.id,
        "Therapist profile created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TherapistResponse::from(therapist),
        }),
    ))
}

/// GET /therapists
pub async fn list_therapists(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapists: Vec<TherapistResponse> = TherapistRepo::list_active(&state.pool)
        .await?
        .into_iter()
        .map(TherapistResponse::from)
        .collect();
    Ok(Json(DataResponse { data: therapists }))
}

/// GET /therapists/{id}
pub async fn get_therapist(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let therapist = find_therapist(&state, id).await?;
    Ok(Json(DataResponse {
        data: TherapistResponse::from(therapist),
    }))
}

/// GET /therapists/me
pub async fn get_my_profile(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    Ok(Json(DataResponse {
        data: TherapistResponse::from(therapist),
    }))
}

/// PUT /therapists/me
pub async fn update_my_profile(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<UpdateTherapist>,
) -> AppResult<impl IntoResponse> {
    if input.display_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "display_name must not be empty".into(),
        )));
    }
    validate_pricing(input.hourly_rate_cents, input.session_length_minutes)?;

    let current = own_profile(&state, &auth).await?;
    let therapist = TherapistRepo::update(&state.pool, current.id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist",
            id: current.id,
        }))?;

    tracing::info!(therapist_id = therapist.id, "Therapist profile updated");

    Ok(Json(DataResponse {
        data: TherapistResponse::from(therapist),
    }))
}

// ---------------------------------------------------------------------------
// Payment account
// ---------------------------------------------------------------------------

/// POST /therapists/me/payments/connect
///
/// Create a connected payout account when missing and return a hosted
/// onboarding link for it.
pub async fn connect_payments(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;

    let account_id = match therapist.payment_account_id.clone() {
        Some(existing) => existing,
        None => {
            let account_id = state
                .payments
                .create_connected_account(&auth.email, therapist.id)
                .await?;
            TherapistRepo::set_payment_account(&state.pool, therapist.id, &account_id).await?;
            tracing::info!(
                therapist_id = therapist.id,
                payment_account_id = %account_id,
                "Connected payment account created"
            );
            account_id
        }
    };

    let base = &state.config.app_base_url;
    let onboarding_url = state
        .payments
        .account_onboarding_link(
            &account_id,
            &format!("{base}/therapist/payments/refresh"),
            &format!("{base}/therapist/payments/complete"),
        )
        .await?;

    Ok(Json(DataResponse {
        data: PaymentOnboarding {
            account_id,
            onboarding_url,
        },
    }))
}

/// POST /therapists/me/payments/refresh
///
/// Re-read payout capabilities from the processor.
pub async fn refresh_payments(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let account_id = therapist.payment_account_id.as_deref().ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "No payment account is connected".into(),
        ))
    })?;

    let caps = state
        .payments
        .retrieve_account_capabilities(account_id)
        .await?;

    let updated = TherapistRepo::update_payout_capabilities(
        &state.pool,
        therapist.id,
        PayoutCapabilities {
            charges_enabled: caps.charges_enabled,
            payouts_enabled: caps.payouts_enabled,
            details_submitted: caps.details_submitted,
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Therapist",
        id: therapist.id,
    }))?;

    tracing::info!(
        therapist_id = updated.id,
        charges_enabled = updated.charges_enabled,
        payouts_enabled = updated.payouts_enabled,
        "Payout capabilities refreshed"
    );

    Ok(Json(DataResponse {
        data: TherapistResponse::from(updated),
    }))
}

/// DELETE /therapists/me/payments
///
/// Forget the connected account and reset all payout flags.
pub async fn disconnect_payments(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let previous_account = therapist.payment_account_id.clone();

    let updated = TherapistRepo::clear_payment_account(&state.pool, therapist.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist",
            id: therapist.id,
        }))?;

    state.event_bus.publish(
        PlatformEvent::new(event_types::THERAPIST_PAYMENTS_DISCONNECTED)
            .with_source("therapist", updated.id)
            .with_actor(Some(auth.user_id))
            .with_payload(serde_json::json!({ "payment_account_id": previous_account })),
    );

    tracing::info!(therapist_id = updated.id, "Payment account disconnected");

    Ok(Json(DataResponse {
        data: TherapistResponse::from(updated),
    }))
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// POST /therapists/me/calendar/connect
///
/// Exchange an OAuth authorization code and store the resulting tokens.
pub async fn connect_calendar(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<CalendarConnectRequest>,
) -> AppResult<impl IntoResponse> {
    let code = input.code.trim();
    if code.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "code must not be empty".into(),
        )));
    }

    let therapist = own_profile(&state, &auth).await?;
    let tokens = state.calendar.exchange_code(code).await?;

    let creds = credentials(tokens);
    let updated = TherapistRepo::connect_calendar(&state.pool, therapist.id, &creds)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist",
            id: therapist.id,
        }))?;

    tracing::info!(therapist_id = updated.id, "Calendar connected");

    Ok(Json(DataResponse {
        data: TherapistResponse::from(updated),
    }))
}

/// DELETE /therapists/me/calendar
pub async fn disconnect_calendar(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let updated = TherapistRepo::disconnect_calendar(&state.pool, therapist.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist",
            id: therapist.id,
        }))?;

    tracing::info!(therapist_id = updated.id, "Calendar disconnected");

    Ok(Json(DataResponse {
        data: TherapistResponse::from(updated),
    }))
}

// ---------------------------------------------------------------------------
// Availability & slots
// ---------------------------------------------------------------------------

/// PUT /therapists/me/availability
///
/// Replace the caller's weekly windows with the given set.
pub async fn replace_availability(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<ReplaceAvailability>,
) -> AppResult<impl IntoResponse> {
    validate_windows(&input.windows)?;

    let therapist = own_profile(&state, &auth).await?;
    let windows =
        AvailabilityRepo::replace_for_therapist(&state.pool, therapist.id, &input.windows).await?;

    tracing::info!(
        therapist_id = therapist.id,
        window_count = windows.len(),
        "Availability replaced"
    );

    Ok(Json(DataResponse { data: windows }))
}

/// GET /therapists/{id}/availability
pub async fn get_availability(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_therapist(&state, id).await?;
    let windows = AvailabilityRepo::list_for_therapist(&state.pool, id).await?;
    Ok(Json(DataResponse { data: windows }))
}

/// GET /therapists/{id}/slots?from=&to=
///
/// Bookable slots in `[from, to)`: availability windows cut into sessions,
/// minus existing bookings and calendar busy time.
pub async fn list_slots(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<SlotParams>,
) -> AppResult<impl IntoResponse> {
    validate_range(params.from, params.to)?;
    let therapist = find_therapist(&state, id).await?;

    let windows: Vec<WeeklyWindow> = AvailabilityRepo::list_for_therapist(&state.pool, id)
        .await?
        .iter()
        .map(WeeklyWindow::from)
        .collect();

    let mut busy: Vec<Interval> =
        BookingSessionRepo::list_busy_for_therapist(&state.pool, id, params.from, params.to)
            .await?
            .into_iter()
            .map(|(start, end)| Interval::new(start, end))
            .collect();
    busy.extend(calendar_busy(&state, &therapist, params.from, params.to).await);

    let slots = compute_slots(
        &windows,
        params.from,
        params.to,
        therapist.session_length_minutes,
        &busy,
        Utc::now(),
    );

    Ok(Json(DataResponse { data: slots }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load the caller's own therapist profile.
pub(crate) async fn own_profile(state: &AppState, auth: &AuthUser) -> AppResult<Therapist> {
    TherapistRepo::find_by_user_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist profile for user",
            id: auth.user_id,
        }))
}

async fn find_therapist(state: &AppState, id: DbId) -> AppResult<Therapist> {
    TherapistRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist",
            id,
        }))
}

fn validate_pricing(rate: Option<i64>, session_minutes: Option<i32>) -> Result<(), CoreError> {
    if rate.is_some_and(|r| r < 0) {
        return Err(CoreError::Validation(
            "hourly_rate_cents must not be negative".into(),
        ));
    }
    if session_minutes.is_some_and(|m| m <= 0) {
        return Err(CoreError::Validation(
            "session_length_minutes must be positive".into(),
        ));
    }
    Ok(())
}

fn credentials(tokens: CalendarTokens) -> CalendarCredentials {
    CalendarCredentials {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: tokens.expires_at,
    }
}

/// Busy intervals from the therapist's connected calendar.
///
/// Expired access tokens are refreshed first. Any calendar failure degrades
/// to an empty list so slots fall back to bookings only.
async fn calendar_busy(
    state: &AppState,
    therapist: &Therapist,
    from: Timestamp,
    to: Timestamp,
) -> Vec<Interval> {
    if therapist.calendar_status != CALENDAR_CONNECTED {
        return Vec::new();
    }
    let Some(mut access_token) = therapist.calendar_access_token.clone() else {
        return Vec::new();
    };

    let expired = therapist
        .calendar_token_expires_at
        .is_some_and(|at| at <= Utc::now());
    if expired {
        if let Some(refresh_token) = therapist.calendar_refresh_token.as_deref() {
            match state.calendar.refresh(refresh_token).await {
                Ok(tokens) => {
                    access_token = tokens.access_token.clone();
                    let creds = credentials(tokens);
                    if let Err(e) =
                        TherapistRepo::connect_calendar(&state.pool, therapist.id, &creds).await
                    {
                        tracing::warn!(
                            therapist_id = therapist.id,
                            error = %e,
                            "Failed to store refreshed calendar tokens"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        therapist_id = therapist.id,
                        error = %e,
                        "Calendar token refresh failed"
                    );
                    let flagged = TherapistRepo::set_calendar_status(
                        &state.pool,
                        therapist.id,
                        CALENDAR_ERROR,
                    )
                    .await;
                    if let Err(e) = flagged {
                        tracing::warn!(
                            therapist_id = therapist.id,
                            error = %e,
                            "Failed to flag calendar error"
                        );
                    }
                    return Vec::new();
                }
            }
        }
    }

    match state.calendar.busy_intervals(&access_token, from, to).await {
        Ok(busy) => busy,
        Err(e) => {
            tracing::warn!(
                therapist_id = therapist.id,
                error = %e,
                "Calendar lookup failed, using bookings only"
            );
            Vec::new()
        }
    }
}
