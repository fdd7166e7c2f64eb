//! Booking creation shared by the manual form and the scheduling widget.
//!
//! Therapists book on behalf of clients on their own calendar only. Every
//! other signed-in caller books for themselves.

use ledgerwell_core::booking::SessionType;
use ledgerwell_core::error::CoreError;
use ledgerwell_core::roles::ROLE_THERAPIST;
use ledgerwell_core::types::DbId;
use ledgerwell_core::validation::{
    normalize_email, require_therapist_id, resolve_end_time, resolve_start_time,
};
use ledgerwell_db::models::booking_session::{BookingSession, CreateBookingSession};
use ledgerwell_db::repositories::{BookingSessionRepo, TherapistRepo, UserRepo};
use ledgerwell_events::{event_types, PlatformEvent};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// A booking submission as received, date and time fields still unparsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub therapist_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub client_email: Option<String>,
    /// RFC 3339. Takes precedence over `session_date` + `start`.
    pub start_time: Option<String>,
    /// `YYYY-MM-DD`
    pub session_date: Option<String>,
    /// `HH:MM`
    pub start: Option<String>,
    pub end_time: Option<String>,
    pub session_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Where a booking came from.
pub enum BookingOrigin<'a> {
    /// The manual booking form, submitted by a signed-in user.
    Manual(&'a AuthUser),
    /// The scheduling widget callback. Replays carry the same event id.
    Scheduler { external_event_id: Option<String> },
}

impl BookingOrigin<'_> {
    fn source(&self) -> &'static str {
        match self {
            BookingOrigin::Manual(_) => ledgerwell_core::booking::SOURCE_MANUAL,
            BookingOrigin::Scheduler { .. } => ledgerwell_core::booking::SOURCE_SCHEDULER,
        }
    }
}

pub struct BookingOutcome {
    pub session: BookingSession,
    /// `false` when a replayed callback matched an existing booking.
    pub created: bool,
}

/// Validate a booking submission and insert it in `scheduled` status.
///
/// Validation failures leave the database untouched.
pub async fn create_booking(
    state: &AppState,
    request: BookingRequest,
    origin: BookingOrigin<'_>,
) -> AppResult<BookingOutcome> {
    let therapist_id = require_therapist_id(request.therapist_id)?;

    let external_event_id = match &origin {
        BookingOrigin::Scheduler { external_event_id } => external_event_id.clone(),
        BookingOrigin::Manual(_) => None,
    };
    if let Some(event_id) = external_event_id.as_deref() {
        if let Some(existing) =
            BookingSessionRepo::find_by_external_event_id(&state.pool, event_id).await?
        {
            tracing::debug!(
                booking_session_id = existing.id,
                external_event_id = %event_id,
                "Scheduling callback replayed, returning existing booking",
            );
            return Ok(BookingOutcome {
                session: existing,
                created: false,
            });
        }
    }

    let start = resolve_start_time(
        request.start_time.as_deref(),
        request.session_date.as_deref(),
        request.start.as_deref(),
    )?;

    let client_email = request
        .client_email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .map(normalize_email)
        .transpose()?;

    let therapist = TherapistRepo::find_by_id(&state.pool, therapist_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Therapist",
            id: therapist_id,
        }))?;

    if let BookingOrigin::Manual(caller) = &origin {
        if caller.role == ROLE_THERAPIST && therapist.user_id != caller.user_id {
            return Err(AppError::Core(CoreError::Forbidden(
                "Therapists may only book sessions on their own calendar".into(),
            )));
        }
    }

    let end = resolve_end_time(
        start,
        request.end_time.as_deref(),
        therapist.session_length_minutes,
    )?;

    let session_type = match request.session_type.as_deref() {
        Some(raw) => SessionType::parse(raw).ok_or_else(|| {
            CoreError::Validation(format!("session_type must be 'free' or 'paid', got '{raw}'"))
        })?,
        None => SessionType::default_for_rate(therapist.hourly_rate_cents),
    };

    let user_id = resolve_client(state, &origin, request.user_id, client_email.as_deref()).await?;

    let client_email = match (client_email, user_id) {
        (Some(email), _) => Some(email),
        (None, Some(id)) => UserRepo::find_by_id(&state.pool, id)
            .await?
            .map(|u| u.email),
        (None, None) => {
            return Err(AppError::Core(CoreError::Validation(
                "client_email is required when the client is not a registered user".into(),
            )))
        }
    };

    let input = CreateBookingSession {
        user_id,
        client_email,
        therapist_id,
        start_time: start,
        end_time: end,
        session_type: session_type.as_str().to_string(),
        source: origin.source().to_string(),
        external_event_id: external_event_id.clone(),
        metadata: request.metadata.unwrap_or_else(|| serde_json::json!({})),
    };

    let session = match BookingSessionRepo::create(&state.pool, &input).await {
        Ok(session) => session,
        // A concurrent replay inserted the same event first.
        Err(sqlx::Error::Database(db_err))
            if db_err.constraint() == Some("uq_booking_sessions_external_event_id") =>
        {
            let event_id = external_event_id.as_deref().unwrap_or_default();
            let existing = BookingSessionRepo::find_by_external_event_id(&state.pool, event_id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(format!("booking for event {event_id} vanished"))
                })?;
            return Ok(BookingOutcome {
                session: existing,
                created: false,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let actor = match &origin {
        BookingOrigin::Manual(caller) => Some(caller.user_id),
        BookingOrigin::Scheduler { .. } => None,
    };
    state.event_bus.publish(
        PlatformEvent::new(event_types::BOOKING_CREATED)
            .with_source("booking_session", session.id)
            .with_actor(actor)
            .with_payload(serde_json::json!({
                "therapist_id": session.therapist_id,
                "user_id": session.user_id,
                "source": session.source,
                "start_time": session.start_time,
            })),
    );

    tracing::info!(
        booking_session_id = session.id,
        therapist_id = session.therapist_id,
        user_id = ?session.user_id,
        source = %session.source,
        "Booking session created",
    );

    Ok(BookingOutcome {
        session,
        created: true,
    })
}

/// Resolve the client's user id: explicit id first, then the signed-in caller
/// (manual form), then a lookup by email.
async fn resolve_client(
    state: &AppState,
    origin: &BookingOrigin<'_>,
    explicit: Option<DbId>,
    client_email: Option<&str>,
) -> AppResult<Option<DbId>> {
    if let Some(user_id) = explicit {
        if let BookingOrigin::Manual(caller) = origin {
            if caller.role != ROLE_THERAPIST && caller.user_id != user_id {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Only therapists may book sessions for another user".into(),
                )));
            }
        }
        UserRepo::find_by_id(&state.pool, user_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "User",
                id: user_id,
            }))?;
        return Ok(Some(user_id));
    }

    // Therapists book on behalf of clients; everyone else books for themselves.
    if let BookingOrigin::Manual(caller) = origin {
        if caller.role != ROLE_THERAPIST {
            return Ok(Some(caller.user_id));
        }
    }

    match client_email {
        Some(email) => Ok(UserRepo::find_by_email(&state.pool, email)
            .await?
            .map(|u| u.id)),
        None => Ok(None),
    }
}
