//! Repository for the `documents` table.

use ledgerwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::document::{CreateDocument, Document};

const COLUMNS: &str = "id, therapist_id, client_user_id, file_name, storage_key, content_type, \
                       size_bytes, created_at, updated_at";

/// Provides CRUD operations for therapist documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Register a new document, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents
                (therapist_id, client_user_id, file_name, storage_key, content_type, size_bytes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.therapist_id)
            .bind(input.client_user_id)
            .bind(&input.file_name)
            .bind(&input.storage_key)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Find a document by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a therapist's documents, newest first.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents WHERE therapist_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a document row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
