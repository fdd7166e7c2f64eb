//! Repository for the `client_notes` table.

use ledgerwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::client_note::{ClientNote, CreateClientNote};

const COLUMNS: &str =
    "id, therapist_id, client_user_id, booking_session_id, body, created_at, updated_at";

/// Provides CRUD operations for client notes.
pub struct ClientNoteRepo;

impl ClientNoteRepo {
    /// Insert a new note for `therapist_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        therapist_id: DbId,
        input: &CreateClientNote,
    ) -> Result<ClientNote, sqlx::Error> {
        let query = format!(
            "INSERT INTO client_notes (therapist_id, client_user_id, booking_session_id, body)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClientNote>(&query)
            .bind(therapist_id)
            .bind(input.client_user_id)
            .bind(input.booking_session_id)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    /// Find a note by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ClientNote>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM client_notes WHERE id = $1");
        sqlx::query_as::<_, ClientNote>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a therapist's notes, optionally for a single client, newest first.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        client_user_id: Option<DbId>,
    ) -> Result<Vec<ClientNote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM client_notes
             WHERE therapist_id = $1 AND ($2::BIGINT IS NULL OR client_user_id = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ClientNote>(&query)
            .bind(therapist_id)
            .bind(client_user_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a note's body.
    pub async fn update_body(
        pool: &PgPool,
        id: DbId,
        body: &str,
    ) -> Result<Option<ClientNote>, sqlx::Error> {
        let query = format!("UPDATE client_notes SET body = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, ClientNote>(&query)
            .bind(id)
            .bind(body)
            .fetch_optional(pool)
            .await
    }

    /// Delete a note. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM client_notes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
