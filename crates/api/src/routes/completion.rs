//! Route definitions for the session completion triggers.

use axum::routing::post;
use axum::Router;

use crate::handlers::completion;
use crate::state::AppState;

/// Completion triggers, merged at the API root.
///
/// ```text
/// POST   /cron/complete-sessions    -> cron_complete_sessions (bearer secret)
/// POST   /admin/sessions/complete   -> admin_complete_sessions (employer admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/cron/complete-sessions",
            post(completion::cron_complete_sessions),
        )
        .route(
            "/admin/sessions/complete",
            post(completion::admin_complete_sessions),
        )
}
