//! Therapist document model and DTOs.

use ledgerwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `documents` table. The file itself lives in object storage
/// under `storage_key`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub therapist_id: DbId,
    pub client_user_id: Option<DbId>,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new document.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub therapist_id: DbId,
    pub client_user_id: Option<DbId>,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}
