//! Route definitions for intake forms.

use axum::routing::get;
use axum::Router;

use crate::handlers::intake_forms;
use crate::state::AppState;

/// Routes mounted at `/intake-forms`.
///
/// ```text
/// GET    /                  -> list_forms
/// POST   /                  -> create_form
/// GET    /{id}              -> get_form
/// PUT    /{id}              -> update_form
/// DELETE /{id}              -> deactivate_form
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(intake_forms::list_forms).post(intake_forms::create_form),
        )
        .route(
            "/{id}",
            get(intake_forms::get_form)
                .put(intake_forms::update_form)
                .delete(intake_forms::deactivate_form),
        )
}
