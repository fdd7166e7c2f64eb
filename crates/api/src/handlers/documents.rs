//! Handlers for therapist documents.
//!
//! File bytes never pass through the API: registering a document returns a
//! presigned upload URL, reading one returns a presigned download URL.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use ledgerwell_core::error::CoreError;
use ledgerwell_core::storage::{
    document_key, validate_document_size, DOWNLOAD_URL_EXPIRY_SECS, UPLOAD_URL_EXPIRY_SECS,
};
use ledgerwell_core::types::DbId;
use ledgerwell_core::validation::require_text;
use ledgerwell_db::models::document::{CreateDocument, Document};
use ledgerwell_db::models::therapist::Therapist;
use ledgerwell_db::repositories::DocumentRepo;
use ledgerwell_integrations::storage::PresignedUrl;

use crate::error::{AppError, AppResult};
use crate::handlers::therapists::own_profile;
use crate::middleware::rbac::RequireTherapist;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /documents`.
#[derive(Debug, Deserialize)]
pub struct RegisterDocument {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub client_user_id: Option<DbId>,
}

/// A document together with a presigned URL for it.
#[derive(Debug, Serialize)]
pub struct DocumentWithUrl {
    #[serde(flatten)]
    pub document: Document,
    pub url: PresignedUrl,
}

/// POST /documents
///
/// Registers the document and returns a presigned upload URL.
pub async fn create_document(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<RegisterDocument>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let file_name = require_text(&input.file_name, "file_name")?;
    let content_type = require_text(&input.content_type, "content_type")?;
    validate_document_size(input.size_bytes)?;

    let storage_key = document_key(
        therapist.id,
        &uuid::Uuid::new_v4().to_string(),
        &file_name,
    );
    let url = state
        .storage
        .presign_upload(&storage_key, &content_type, UPLOAD_URL_EXPIRY_SECS)
        .await?;

    let document = DocumentRepo::create(
        &state.pool,
        &CreateDocument {
            therapist_id: therapist.id,
            client_user_id: input.client_user_id,
            file_name,
            storage_key,
            content_type,
            size_bytes: input.size_bytes,
        },
    )
    .await?;

    tracing::info!(
        document_id = document.id,
        therapist_id = therapist.id,
        size_bytes = document.size_bytes,
        "Document registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: DocumentWithUrl { document, url },
        }),
    ))
}

/// GET /documents
pub async fn list_documents(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let documents = DocumentRepo::list_for_therapist(&state.pool, therapist.id).await?;
    Ok(Json(DataResponse { data: documents }))
}

/// GET /documents/{id}
///
/// Returns the document with a short-lived download URL.
pub async fn get_document(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let therapist = own_profile(&state, &auth).await?;
    let document = find_owned(&state, &therapist, id).await?;
    let url = state
        .storage
        .presign_download(&document.storage_key, DOWNLOAD_URL_EXPIRY_SECS)
        .await?;
    Ok(Json(DataResponse {
        data: DocumentWithUrl { document, url },
    }))
}

/// DELETE /documents/{id}
pub async fn delete_document(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let therapist = own_profile(&state, &auth).await?;
    let document = find_owned(&state, &therapist, id).await?;

    state.storage.delete(&document.storage_key).await?;
    DocumentRepo::delete(&state.pool, document.id).await?;

    tracing::info!(document_id = id, therapist_id = therapist.id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Another therapist's document is reported as missing.
async fn find_owned(state: &AppState, therapist: &Therapist, id: DbId) -> AppResult<Document> {
    DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|d| d.therapist_id == therapist.id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Document",
            id,
        }))
}
