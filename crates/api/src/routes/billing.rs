//! Route definitions for employer billing.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::billing;
use crate::state::AppState;

/// Routes mounted at `/billing`.
///
/// ```text
/// POST   /customer          -> create_customer
/// POST   /sync              -> sync
/// GET    /subscription      -> get_subscription
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer", post(billing::create_customer))
        .route("/sync", post(billing::sync))
        .route("/subscription", get(billing::get_subscription))
}
