//! Route definitions for therapist profiles, payouts, calendars and
//! availability.
//!
//! The `/me` routes act on the caller's own profile and are registered
//! alongside the public `/{id}` routes.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::therapists;
use crate::state::AppState;

/// Routes mounted at `/therapists`.
///
/// ```text
/// GET    /                        -> list_therapists
/// POST   /                        -> create_profile
/// GET    /me                      -> get_my_profile
/// PUT    /me                      -> update_my_profile
/// POST   /me/payments/connect     -> connect_payments
/// POST   /me/payments/refresh     -> refresh_payments
/// DELETE /me/payments             -> disconnect_payments
/// POST   /me/calendar/connect     -> connect_calendar
/// DELETE /me/calendar             -> disconnect_calendar
/// PUT    /me/availability         -> replace_availability
/// GET    /{id}                    -> get_therapist
/// GET    /{id}/availability       -> get_availability
/// GET    /{id}/slots              -> list_slots
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(therapists::list_therapists).post(therapists::create_profile),
        )
        .route(
            "/me",
            get(therapists::get_my_profile).put(therapists::update_my_profile),
        )
        .route("/me/payments/connect", post(therapists::connect_payments))
        .route("/me/payments/refresh", post(therapists::refresh_payments))
        .route("/me/payments", delete(therapists::disconnect_payments))
        .route("/me/calendar/connect", post(therapists::connect_calendar))
        .route("/me/calendar", delete(therapists::disconnect_calendar))
        .route("/me/availability", put(therapists::replace_availability))
        .route("/{id}", get(therapists::get_therapist))
        .route("/{id}/availability", get(therapists::get_availability))
        .route("/{id}/slots", get(therapists::list_slots))
}
