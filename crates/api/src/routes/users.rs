//! Route definitions for the authenticated user.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /me                -> get_me
/// PUT    /me/role           -> update_role
/// POST   /me/onboarding     -> complete_onboarding
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::get_me))
        .route("/me/role", put(users::update_role))
        .route("/me/onboarding", post(users::complete_onboarding))
}
