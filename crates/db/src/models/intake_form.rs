//! Intake form definitions owned by therapists.

use ledgerwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `intake_forms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IntakeForm {
    pub id: DbId,
    pub therapist_id: DbId,
    pub title: String,
    pub description: Option<String>,
    /// JSON array of field definitions rendered by the client.
    pub fields: serde_json::Value,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an intake form.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntakeForm {
    pub title: String,
    pub description: Option<String>,
    pub fields: Option<serde_json::Value>,
}

/// DTO for updating an intake form. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIntakeForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}
