//! Session completion triggers.
//!
//! The batch runs on demand from an external scheduler or an employer admin.
//! Both return the batch report; per-session failures are part of the body,
//! not an error status.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::auth::signature::require_bearer_secret;
use crate::engine::session_completion::SessionCompletionEngine;
use crate::error::AppResult;
use crate::middleware::rbac::RequireEmployerAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /cron/complete-sessions
///
/// Requires `Authorization: Bearer <CRON_SECRET>`.
pub async fn cron_complete_sessions(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    require_bearer_secret(&headers, &state.config.cron_secret)?;

    let report = SessionCompletionEngine::from_state(&state)
        .run_batch(Utc::now())
        .await?;

    tracing::info!(
        processed = report.processed,
        completed = report.completed,
        errors = report.errors.len(),
        trigger = "cron",
        "Session completion triggered"
    );

    Ok(Json(DataResponse { data: report }))
}

/// POST /admin/sessions/complete
pub async fn admin_complete_sessions(
    RequireEmployerAdmin(admin): RequireEmployerAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let report = SessionCompletionEngine::from_state(&state)
        .run_batch(Utc::now())
        .await?;

    tracing::info!(
        user_id = admin.user_id,
        processed = report.processed,
        completed = report.completed,
        errors = report.errors.len(),
        trigger = "admin",
        "Session completion triggered"
    );

    Ok(Json(DataResponse { data: report }))
}
