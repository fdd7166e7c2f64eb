//! Handlers for the signed-in user's own account.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use ledgerwell_core::error::CoreError;
use ledgerwell_core::roles::{is_known_role, is_self_assignable_role};
use ledgerwell_db::models::user::{UpdateUser, User};
use ledgerwell_db::repositories::UserRepo;
use ledgerwell_events::{event_types, PlatformEvent};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /users/me/role`.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// GET /users/me
pub async fn get_me(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(DataResponse { data: user }))
}

/// PUT /users/me/role
///
/// Pick a role during onboarding. Locked once onboarding is complete.
/// Only `employee` and `therapist` can be self-selected.
pub async fn update_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    let role = input.role.trim();
    if !is_known_role(role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "unknown role '{role}'"
        ))));
    }
    if !is_self_assignable_role(role) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "role '{role}' cannot be self-assigned"
        ))));
    }

    let current = load_user(&state, &auth).await?;
    if current.onboarding_complete {
        return Err(AppError::Core(CoreError::Conflict(
            "Role cannot be changed after onboarding is complete".into(),
        )));
    }

    let user = UserRepo::update(
        &state.pool,
        auth.user_id,
        &UpdateUser {
            role: Some(role.to_string()),
            ..Default::default()
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "User",
        id: auth.user_id,
    }))?;

    sync_metadata(&state, &user).await;

    tracing::info!(user_id = user.id, role = %user.role, "User role updated");

    Ok(Json(DataResponse { data: user }))
}

/// POST /users/me/onboarding
///
/// Mark onboarding complete locally and mirror it to the identity provider.
pub async fn complete_onboarding(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::update(
        &state.pool,
        auth.user_id,
        &UpdateUser {
            onboarding_complete: Some(true),
            ..Default::default()
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "User",
        id: auth.user_id,
    }))?;

    sync_metadata(&state, &user).await;

    state.event_bus.publish(
        PlatformEvent::new(event_types::USER_ONBOARDED)
            .with_source("user", user.id)
            .with_actor(Some(user.id))
            .with_payload(serde_json::json!({ "role": user.role })),
    );

    tracing::info!(user_id = user.id, role = %user.role, "User onboarding completed");

    Ok(Json(DataResponse { data: user }))
}

async fn load_user(state: &AppState, auth: &AuthUser) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))
}

/// Write `{ role, onboarding_complete }` to the provider's public metadata.
///
/// The local row is authoritative, so a failed write is logged and the
/// request still succeeds.
async fn sync_metadata(state: &AppState, user: &User) {
    let metadata = serde_json::json!({
        "role": user.role,
        "onboarding_complete": user.onboarding_complete,
    });
    if let Err(e) = state
        .identity
        .update_public_metadata(&user.external_id, metadata)
        .await
    {
        tracing::warn!(
            user_id = user.id,
            error = %e,
            "Failed to sync identity metadata",
        );
    }
}
