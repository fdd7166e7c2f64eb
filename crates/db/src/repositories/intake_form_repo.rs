//! Repository for the `intake_forms` table.

use ledgerwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::intake_form::{CreateIntakeForm, IntakeForm, UpdateIntakeForm};

const COLUMNS: &str =
    "id, therapist_id, title, description, fields, is_active, created_at, updated_at";

/// Provides CRUD operations for intake forms.
pub struct IntakeFormRepo;

impl IntakeFormRepo {
    /// Insert a new form for `therapist_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        therapist_id: DbId,
        input: &CreateIntakeForm,
    ) -> Result<IntakeForm, sqlx::Error> {
        let query = format!(
            "INSERT INTO intake_forms (therapist_id, title, description, fields)
             VALUES ($1, $2, $3, COALESCE($4, '[]'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntakeForm>(&query)
            .bind(therapist_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.fields)
            .fetch_one(pool)
            .await
    }

    /// Find a form by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<IntakeForm>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM intake_forms WHERE id = $1");
        sqlx::query_as::<_, IntakeForm>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a therapist's forms, optionally including inactive ones.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        include_inactive: bool,
    ) -> Result<Vec<IntakeForm>, sqlx::Error> {
        let query = if include_inactive {
            format!("SELECT {COLUMNS} FROM intake_forms WHERE therapist_id = $1 ORDER BY title, id")
        } else {
            format!(
                "SELECT {COLUMNS} FROM intake_forms
                 WHERE therapist_id = $1 AND is_active = true
                 ORDER BY title, id"
            )
        };
        sqlx::query_as::<_, IntakeForm>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// Update a form. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateIntakeForm,
    ) -> Result<Option<IntakeForm>, sqlx::Error> {
        let query = format!(
            "UPDATE intake_forms SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                fields = COALESCE($4, fields),
                is_active = COALESCE($5, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntakeForm>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.fields)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Deactivate a form (set is_active = false).
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE intake_forms SET is_active = false WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
