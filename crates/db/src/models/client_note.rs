//! Therapist notes about a client.

use ledgerwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `client_notes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientNote {
    pub id: DbId,
    pub therapist_id: DbId,
    pub client_user_id: DbId,
    pub booking_session_id: Option<DbId>,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a note.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientNote {
    pub client_user_id: DbId,
    pub booking_session_id: Option<DbId>,
    pub body: String,
}

/// DTO for updating a note.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateClientNote {
    pub body: String,
}
