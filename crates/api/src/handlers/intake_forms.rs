//! Handlers for therapist-owned intake forms.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use ledgerwell_core::error::CoreError;
use ledgerwell_core::types::DbId;
use ledgerwell_core::validation::require_text;
use ledgerwell_db::models::intake_form::{CreateIntakeForm, IntakeForm, UpdateIntakeForm};
use ledgerwell_db::models::therapist::Therapist;
use ledgerwell_db::repositories::IntakeFormRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::therapists::own_profile;
use crate::middleware::rbac::RequireTherapist;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /intake-forms?include_inactive=false
pub async fn list_forms(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let forms =
        IntakeFormRepo::list_for_therapist(&state.pool, therapist.id, params.include_inactive)
            .await?;
    Ok(Json(DataResponse { data: forms }))
}

/// POST /intake-forms
pub async fn create_form(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(mut input): Json<CreateIntakeForm>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    input.title = require_text(&input.title, "title")?;
    validate_fields(input.fields.as_ref())?;

    let form = IntakeFormRepo::create(&state.pool, therapist.id, &input).await?;

    tracing::info!(intake_form_id = form.id, therapist_id = therapist.id, "Intake form created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: form })))
}

/// GET /intake-forms/{id}
pub async fn get_form(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let form = find_owned(&state, &therapist, id).await?;
    Ok(Json(DataResponse { data: form }))
}

/// PUT /intake-forms/{id}
pub async fn update_form(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateIntakeForm>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    find_owned(&state, &therapist, id).await?;

    if let Some(title) = input.title.as_deref() {
        input.title = Some(require_text(title, "title")?);
    }
    validate_fields(input.fields.as_ref())?;

    let form = IntakeFormRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "IntakeForm",
            id,
        }))?;

    tracing::info!(intake_form_id = id, therapist_id = therapist.id, "Intake form updated");

    Ok(Json(DataResponse { data: form }))
}

/// DELETE /intake-forms/{id}
///
/// Soft delete: the form is deactivated and hidden from default listings.
pub async fn deactivate_form(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let therapist = own_profile(&state, &auth).await?;
    find_owned(&state, &therapist, id).await?;

    if IntakeFormRepo::deactivate(&state.pool, id).await? {
        tracing::info!(intake_form_id = id, therapist_id = therapist.id, "Intake form deactivated");
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_fields(fields: Option<&serde_json::Value>) -> Result<(), CoreError> {
    match fields {
        Some(value) if !value.is_array() => Err(CoreError::Validation(
            "fields must be a JSON array".into(),
        )),
        _ => Ok(()),
    }
}

async fn find_owned(state: &AppState, therapist: &Therapist, id: DbId) -> AppResult<IntakeForm> {
    IntakeFormRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|f| f.therapist_id == therapist.id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "IntakeForm",
            id,
        }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn fields_must_be_an_array_when_present() {
        assert!(validate_fields(None).is_ok());
        assert!(validate_fields(Some(&json!([{"label": "Income"}]))).is_ok());
        assert_matches!(
            validate_fields(Some(&json!({"label": "Income"}))),
            Err(CoreError::Validation(_))
        );
    }
}
