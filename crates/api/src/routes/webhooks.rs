//! Route definitions for inbound provider webhooks. These routes carry no
//! session auth; each handler verifies its provider's signature.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST   /identity          -> identity
/// POST   /scheduling        -> scheduling
/// POST   /payments          -> payments
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/identity", post(webhooks::identity))
        .route("/scheduling", post(webhooks::scheduling))
        .route("/payments", post(webhooks::payments))
}
