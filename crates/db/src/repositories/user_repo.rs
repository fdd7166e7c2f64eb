//! Repository for the `users` table.

use ledgerwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, external_id, email, first_name, last_name, role, is_active, \
                       onboarding_complete, payment_customer_id, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (external_id, email, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.external_id)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Insert or refresh a user keyed by identity-provider id.
    ///
    /// On conflict the profile fields and role are overwritten with the
    /// provider's values; `is_active` is restored to `true`.
    pub async fn upsert_by_external_id(
        pool: &PgPool,
        input: &CreateUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (external_id, email, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT ON CONSTRAINT uq_users_external_id DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                role = EXCLUDED.role,
                is_active = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.external_id)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by identity-provider id.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE external_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE lower(email) = lower($1) AND is_active = true
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active),
                onboarding_complete = COALESCE($7, onboarding_complete)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.role)
            .bind(input.is_active)
            .bind(input.onboarding_complete)
            .fetch_optional(pool)
            .await
    }

    /// Store the payment-processor customer id for a user.
    pub async fn set_payment_customer_id(
        pool: &PgPool,
        id: DbId,
        customer_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET payment_customer_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate a user by identity-provider id.
    ///
    /// Returns `true` if the row was updated.
    pub async fn deactivate_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = false WHERE external_id = $1 AND is_active = true",
        )
        .bind(external_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
