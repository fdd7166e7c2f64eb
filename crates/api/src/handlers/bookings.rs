//! Handlers for booking sessions.
//!
//! Clients see their own sessions, therapists see sessions booked with them,
//! employer admins see everything.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use ledgerwell_core::booking::state_machine::validate_transition;
use ledgerwell_core::error::CoreError;
use ledgerwell_core::roles::{ROLE_EMPLOYER_ADMIN, ROLE_THERAPIST};
use ledgerwell_core::types::{DbId, Timestamp};
use ledgerwell_db::models::booking_session::{BookingFilter, BookingSession};
use ledgerwell_db::models::status::{BookingStatus, StatusId};
use ledgerwell_db::repositories::{BookingSessionRepo, TherapistRepo};
use ledgerwell_events::{event_types, PlatformEvent};

use crate::engine::booking::{
    create_booking as create_booking_flow, BookingOrigin, BookingRequest,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /bookings`.
#[derive(Debug, Deserialize)]
pub struct BookingListParams {
    pub status_id: Option<StatusId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /bookings
///
/// Manual booking form.
pub async fn create_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<BookingRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = create_booking_flow(&state, input, BookingOrigin::Manual(&auth)).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: outcome.session,
        }),
    ))
}

/// GET /bookings?status_id=&from=&to=&limit=&offset=
pub async fn list_bookings(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<BookingListParams>,
) -> AppResult<impl IntoResponse> {
    let mut filter = BookingFilter {
        status_id: params.status_id,
        from: params.from,
        to: params.to,
        ..Default::default()
    };

    match auth.role.as_str() {
        ROLE_EMPLOYER_ADMIN => {}
        ROLE_THERAPIST => match TherapistRepo::find_by_user_id(&state.pool, auth.user_id).await? {
            Some(therapist) => filter.therapist_id = Some(therapist.id),
            None => filter.user_id = Some(auth.user_id),
        },
        _ => filter.user_id = Some(auth.user_id),
    }

    let sessions =
        BookingSessionRepo::list(&state.pool, &filter, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /bookings/{id}
pub async fn get_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = find_session(&state, id).await?;
    let access = access_for(&state, &auth, &session).await?;
    if access == Access::None {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not a participant in this booking".into(),
        )));
    }
    Ok(Json(DataResponse { data: session }))
}

/// POST /bookings/{id}/confirm
///
/// The booked therapist confirms a scheduled session.
pub async fn confirm_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = find_session(&state, id).await?;
    if access_for(&state, &auth, &session).await? != Access::Therapist {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the booked therapist can confirm a session".into(),
        )));
    }

    let updated = apply_transition(
        &state,
        &session,
        &[BookingStatus::Scheduled.id()],
        BookingStatus::Confirmed,
    )
    .await?;

    state.event_bus.publish(
        PlatformEvent::new(event_types::BOOKING_CONFIRMED)
            .with_source("booking_session", updated.id)
            .with_actor(Some(auth.user_id)),
    );
    tracing::info!(booking_session_id = updated.id, user_id = auth.user_id, "Booking confirmed");

    Ok(Json(DataResponse { data: updated }))
}

/// POST /bookings/{id}/cancel
///
/// Any participant (or an employer admin) may cancel an open session.
pub async fn cancel_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = find_session(&state, id).await?;
    if access_for(&state, &auth, &session).await? == Access::None {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not a participant in this booking".into(),
        )));
    }

    let updated = apply_transition(
        &state,
        &session,
        &[BookingStatus::Scheduled.id(), BookingStatus::Confirmed.id()],
        BookingStatus::Cancelled,
    )
    .await?;

    state.event_bus.publish(
        PlatformEvent::new(event_types::BOOKING_CANCELLED)
            .with_source("booking_session", updated.id)
            .with_actor(Some(auth.user_id)),
    );
    tracing::info!(booking_session_id = updated.id, user_id = auth.user_id, "Booking cancelled");

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The caller's relationship to a booking.
#[derive(Debug, PartialEq, Eq)]
enum Access {
    None,
    Client,
    Therapist,
    Admin,
}

async fn access_for(
    state: &AppState,
    auth: &AuthUser,
    session: &BookingSession,
) -> AppResult<Access> {
    if auth.role == ROLE_THERAPIST {
        let owns = TherapistRepo::find_by_user_id(&state.pool, auth.user_id)
            .await?
            .is_some_and(|t| t.id == session.therapist_id);
        if owns {
            return Ok(Access::Therapist);
        }
    }
    if session.user_id == Some(auth.user_id) {
        return Ok(Access::Client);
    }
    if auth.role == ROLE_EMPLOYER_ADMIN {
        return Ok(Access::Admin);
    }
    Ok(Access::None)
}

async fn find_session(state: &AppState, id: DbId) -> AppResult<BookingSession> {
    BookingSessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BookingSession",
            id,
        }))
}

/// Conditionally move `session` to `to`. A concurrent change that left the
/// session outside `from` is reported as a conflict.
async fn apply_transition(
    state: &AppState,
    session: &BookingSession,
    from: &[StatusId],
    to: BookingStatus,
) -> AppResult<BookingSession> {
    validate_transition(session.status_id, to.id()).map_err(|msg| {
        AppError::Core(CoreError::Conflict(msg))
    })?;

    match BookingSessionRepo::transition(&state.pool, session.id, from, to).await? {
        Some(updated) => Ok(updated),
        None => {
            let current = find_session(state, session.id).await?;
            let msg = validate_transition(current.status_id, to.id())
                .err()
                .unwrap_or_else(|| "Booking changed concurrently, retry".to_string());
            Err(AppError::Core(CoreError::Conflict(msg)))
        }
    }
}
