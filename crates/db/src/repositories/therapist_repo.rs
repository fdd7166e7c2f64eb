//! Repository for the `therapists` table.

use ledgerwell_core::booking::DEFAULT_SESSION_MINUTES;
use ledgerwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::therapist::{
    CalendarCredentials, CreateTherapist, PayoutCapabilities, Therapist, UpdateTherapist,
    CALENDAR_CONNECTED, CALENDAR_DISCONNECTED,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, display_name, bio, hourly_rate_cents, currency, \
                       session_length_minutes, timezone, payment_account_id, charges_enabled, \
                       payouts_enabled, details_submitted, calendar_status, calendar_access_token, \
                       calendar_refresh_token, calendar_token_expires_at, scheduling_url, \
                       created_at, updated_at";

/// Provides CRUD and integration-state operations for therapists.
pub struct TherapistRepo;

impl TherapistRepo {
    /// Insert a new therapist profile for `user_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateTherapist,
    ) -> Result<Therapist, sqlx::Error> {
        let query = format!(
            "INSERT INTO therapists
                (user_id, display_name, bio, hourly_rate_cents, currency,
                 session_length_minutes, timezone, scheduling_url)
             VALUES ($1, $2, $3, COALESCE($4, 0), COALESCE($5, 'usd'),
                     $6, COALESCE($7, 'UTC'), $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(user_id)
            .bind(&input.display_name)
            .bind(&input.bio)
            .bind(input.hourly_rate_cents)
            .bind(&input.currency)
            .bind(input.session_length_minutes.unwrap_or(DEFAULT_SESSION_MINUTES))
            .bind(&input.timezone)
            .bind(&input.scheduling_url)
            .fetch_one(pool)
            .await
    }

    /// Find a therapist by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM therapists WHERE id = $1");
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the therapist profile linked to a user.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM therapists WHERE user_id = $1");
        sqlx::query_as::<_, Therapist>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the therapist owning a payment-processor account.
    pub async fn find_by_payment_account_id(
        pool: &PgPool,
        account_id: &str,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM therapists WHERE payment_account_id = $1");
        sqlx::query_as::<_, Therapist>(&query)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    /// List therapists whose linked user is active, ordered by name.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Therapist>, sqlx::Error> {
        let query = format!(
            "SELECT {cols} FROM therapists t
             WHERE EXISTS (SELECT 1 FROM users u WHERE u.id = t.user_id AND u.is_active = true)
             ORDER BY t.display_name, t.id",
            cols = prefixed_columns("t")
        );
        sqlx::query_as::<_, Therapist>(&query).fetch_all(pool).await
    }

    /// Update a therapist profile. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTherapist,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!(
            "UPDATE therapists SET
                display_name = COALESCE($2, display_name),
                bio = COALESCE($3, bio),
                hourly_rate_cents = COALESCE($4, hourly_rate_cents),
                currency = COALESCE($5, currency),
                session_length_minutes = COALESCE($6, session_length_minutes),
                timezone = COALESCE($7, timezone),
                scheduling_url = COALESCE($8, scheduling_url)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .bind(&input.display_name)
            .bind(&input.bio)
            .bind(input.hourly_rate_cents)
            .bind(&input.currency)
            .bind(input.session_length_minutes)
            .bind(&input.timezone)
            .bind(&input.scheduling_url)
            .fetch_optional(pool)
            .await
    }

    /// Link a payment-processor connected account.
    pub async fn set_payment_account(
        pool: &PgPool,
        id: DbId,
        account_id: &str,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!(
            "UPDATE therapists SET payment_account_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    /// Record payout capability flags reported by the processor.
    pub async fn update_payout_capabilities(
        pool: &PgPool,
        id: DbId,
        caps: PayoutCapabilities,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!(
            "UPDATE therapists SET
                charges_enabled = $2,
                payouts_enabled = $3,
                details_submitted = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .bind(caps.charges_enabled)
            .bind(caps.payouts_enabled)
            .bind(caps.details_submitted)
            .fetch_optional(pool)
            .await
    }

    /// Disconnect the payment integration: clear the account reference and
    /// every payout flag.
    pub async fn clear_payment_account(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!(
            "UPDATE therapists SET
                payment_account_id = NULL,
                charges_enabled = false,
                payouts_enabled = false,
                details_submitted = false
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Store calendar OAuth tokens and mark the calendar connected.
    pub async fn connect_calendar(
        pool: &PgPool,
        id: DbId,
        creds: &CalendarCredentials,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!(
            "UPDATE therapists SET
                calendar_status = $2,
                calendar_access_token = $3,
                calendar_refresh_token = COALESCE($4, calendar_refresh_token),
                calendar_token_expires_at = $5
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .bind(CALENDAR_CONNECTED)
            .bind(&creds.access_token)
            .bind(&creds.refresh_token)
            .bind(creds.expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Set the calendar integration status without touching tokens.
    pub async fn set_calendar_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE therapists SET calendar_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear calendar tokens and mark the calendar disconnected.
    pub async fn disconnect_calendar(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Therapist>, sqlx::Error> {
        let query = format!(
            "UPDATE therapists SET
                calendar_status = $2,
                calendar_access_token = NULL,
                calendar_refresh_token = NULL,
                calendar_token_expires_at = NULL
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Therapist>(&query)
            .bind(id)
            .bind(CALENDAR_DISCONNECTED)
            .fetch_optional(pool)
            .await
    }
}

/// Column list qualified with a table alias, for joins.
fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
