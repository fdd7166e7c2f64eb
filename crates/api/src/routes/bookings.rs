//! Route definitions for booking sessions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// GET    /                  -> list_bookings
/// POST   /                  -> create_booking
/// GET    /{id}              -> get_booking
/// POST   /{id}/confirm      -> confirm_booking
/// POST   /{id}/cancel       -> cancel_booking
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/confirm", post(bookings::confirm_booking))
        .route("/{id}/cancel", post(bookings::cancel_booking))
}
