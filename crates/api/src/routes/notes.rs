//! Route definitions for client notes.

use axum::routing::get;
use axum::Router;

use crate::handlers::client_notes;
use crate::state::AppState;

/// Routes mounted at `/client-notes`.
///
/// ```text
/// GET    /                  -> list_notes
/// POST   /                  -> create_note
/// GET    /{id}              -> get_note
/// PUT    /{id}              -> update_note
/// DELETE /{id}              -> delete_note
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(client_notes::list_notes).post(client_notes::create_note),
        )
        .route(
            "/{id}",
            get(client_notes::get_note)
                .put(client_notes::update_note)
                .delete(client_notes::delete_note),
        )
}
