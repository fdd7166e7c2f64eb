//! Repository for the `therapist_availability` table.

use ledgerwell_core::availability::WeeklyWindow;
use ledgerwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::availability::AvailabilityWindow;

const COLUMNS: &str = "id, therapist_id, weekday, start_minute, end_minute, created_at";

/// Provides read and replace operations for weekly availability.
pub struct AvailabilityRepo;

impl AvailabilityRepo {
    /// List a therapist's windows ordered by weekday then start.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
    ) -> Result<Vec<AvailabilityWindow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM therapist_availability
             WHERE therapist_id = $1
             ORDER BY weekday, start_minute"
        );
        sqlx::query_as::<_, AvailabilityWindow>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// Replace all windows for a therapist in a single transaction.
    pub async fn replace_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        windows: &[WeeklyWindow],
    ) -> Result<Vec<AvailabilityWindow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM therapist_availability WHERE therapist_id = $1")
            .bind(therapist_id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO therapist_availability (therapist_id, weekday, start_minute, end_minute)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let mut rows = Vec::with_capacity(windows.len());
        for w in windows {
            let row = sqlx::query_as::<_, AvailabilityWindow>(&insert)
                .bind(therapist_id)
                .bind(w.weekday)
                .bind(w.start_minute)
                .bind(w.end_minute)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;
        rows.sort_by_key(|r| (r.weekday, r.start_minute));
        Ok(rows)
    }
}
