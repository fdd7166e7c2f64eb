//! Handlers for private therapist notes about clients.
//!
//! Notes are visible only to the therapist who wrote them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use ledgerwell_core::error::CoreError;
use ledgerwell_core::types::DbId;
use ledgerwell_core::validation::require_text;
use ledgerwell_db::models::client_note::{ClientNote, CreateClientNote, UpdateClientNote};
use ledgerwell_db::models::therapist::Therapist;
use ledgerwell_db::repositories::ClientNoteRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::therapists::own_profile;
use crate::middleware::rbac::RequireTherapist;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /client-notes`.
#[derive(Debug, Deserialize)]
pub struct NoteListParams {
    pub client_user_id: Option<DbId>,
}

/// GET /client-notes?client_user_id=
pub async fn list_notes(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Query(params): Query<NoteListParams>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let notes =
        ClientNoteRepo::list_for_therapist(&state.pool, therapist.id, params.client_user_id)
            .await?;
    Ok(Json(DataResponse { data: notes }))
}

/// POST /client-notes
pub async fn create_note(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(mut input): Json<CreateClientNote>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    input.body = require_text(&input.body, "body")?;

    let note = ClientNoteRepo::create(&state.pool, therapist.id, &input).await?;

    tracing::info!(
        client_note_id = note.id,
        therapist_id = therapist.id,
        client_user_id = note.client_user_id,
        "Client note created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}

/// GET /client-notes/{id}
pub async fn get_note(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let note = find_owned(&state, &therapist, id).await?;
    Ok(Json(DataResponse { data: note }))
}

/// PUT /client-notes/{id}
pub async fn update_note(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateClientNote>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    find_owned(&state, &therapist, id).await?;
    let body = require_text(&input.body, "body")?;

    let note = ClientNoteRepo::update_body(&state.pool, id, &body)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClientNote",
            id,
        }))?;

    tracing::info!(client_note_id = id, therapist_id = therapist.id, "Client note updated");

    Ok(Json(DataResponse { data: note }))
}

/// DELETE /client-notes/{id}
pub async fn delete_note(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let therapist = own_profile(&state, &auth).await?;
    find_owned(&state, &therapist, id).await?;

    ClientNoteRepo::delete(&state.pool, id).await?;
    tracing::info!(client_note_id = id, therapist_id = therapist.id, "Client note deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_owned(state: &AppState, therapist: &Therapist, id: DbId) -> AppResult<ClientNote> {
    ClientNoteRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|n| n.therapist_id == therapist.id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClientNote",
            id,
        }))
}
