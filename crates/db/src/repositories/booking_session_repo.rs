//! Repository for the `booking_sessions` table.

use ledgerwell_core::booking::PAYMENT_PENDING;
use ledgerwell_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::booking_session::{
    BookingFilter, BookingSession, CompletionCandidate, CreateBookingSession,
};
use crate::models::status::{BookingStatus, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, client_email, therapist_id, session_date, start_time, \
                       end_time, status_id, session_type, payment_required, payment_status, \
                       payment_reference, source, external_event_id, metadata, completed_at, \
                       cancelled_at, created_at, updated_at";

/// Default and maximum number of sessions returned by list queries.
const MAX_LIST_LIMIT: i64 = 500;

/// Provides CRUD and workflow operations for booking sessions.
pub struct BookingSessionRepo;

impl BookingSessionRepo {
    /// Insert a new booking session in `scheduled` status.
    ///
    /// `session_date` is derived from the UTC start time.
    pub async fn create(
        pool: &PgPool,
        input: &CreateBookingSession,
    ) -> Result<BookingSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO booking_sessions
                (user_id, client_email, therapist_id, session_date, start_time, end_time,
                 status_id, session_type, payment_required, source, external_event_id, metadata)
             VALUES ($1, $2, $3, ($4 AT TIME ZONE 'UTC')::date, $4, $5,
                     $6, $7, false, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingSession>(&query)
            .bind(input.user_id)
            .bind(&input.client_email)
            .bind(input.therapist_id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(BookingStatus::Scheduled.id())
            .bind(&input.session_type)
            .bind(&input.source)
            .bind(&input.external_event_id)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Find a session by internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BookingSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM booking_sessions WHERE id = $1");
        sqlx::query_as::<_, BookingSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session created from a given scheduling-widget event.
    pub async fn find_by_external_event_id(
        pool: &PgPool,
        external_event_id: &str,
    ) -> Result<Option<BookingSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM booking_sessions WHERE external_event_id = $1");
        sqlx::query_as::<_, BookingSession>(&query)
            .bind(external_event_id)
            .fetch_optional(pool)
            .await
    }

    /// List sessions matching `filter`, most recent start first.
    pub async fn list(
        pool: &PgPool,
        filter: &BookingFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<BookingSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM booking_sessions
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::BIGINT IS NULL OR therapist_id = $2)
               AND ($3::SMALLINT IS NULL OR status_id = $3)
               AND ($4::TIMESTAMPTZ IS NULL OR start_time >= $4)
               AND ($5::TIMESTAMPTZ IS NULL OR start_time < $5)
             ORDER BY start_time DESC, id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, BookingSession>(&query)
            .bind(filter.user_id)
            .bind(filter.therapist_id)
            .bind(filter.status_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(clamp_limit(limit))
            .bind(offset.unwrap_or(0).max(0))
            .fetch_all(pool)
            .await
    }

    /// Start/end pairs of a therapist's non-cancelled sessions overlapping
    /// `[from, to)`. Used to block out availability slots.
    pub async fn list_busy_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<(Timestamp, Timestamp)>, sqlx::Error> {
        sqlx::query_as::<_, (Timestamp, Timestamp)>(
            "SELECT start_time, end_time FROM booking_sessions
             WHERE therapist_id = $1
               AND status_id <> $2
               AND start_time < $4
               AND end_time > $3
             ORDER BY start_time",
        )
        .bind(therapist_id)
        .bind(BookingStatus::Cancelled.id())
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Select sessions eligible for completion: end time strictly before
    /// `now` and status still scheduled or confirmed.
    ///
    /// Must stay in sync with `ledgerwell_core::booking::is_completion_eligible`.
    pub async fn list_completion_eligible(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<CompletionCandidate>, sqlx::Error> {
        sqlx::query_as::<_, CompletionCandidate>(
            "SELECT b.id, b.therapist_id, b.user_id, b.status_id, b.start_time, b.end_time,
                    b.session_type, t.hourly_rate_cents, t.currency, t.payment_account_id
             FROM booking_sessions b
             JOIN therapists t ON t.id = b.therapist_id
             WHERE b.end_time < $1
               AND b.status_id IN ($2, $3)
             ORDER BY b.end_time, b.id
             LIMIT $4",
        )
        .bind(now)
        .bind(BookingStatus::Scheduled.id())
        .bind(BookingStatus::Confirmed.id())
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Transition a session to `completed`.
    ///
    /// Only applies while the session is still scheduled or confirmed, so a
    /// concurrent completion or cancellation wins. Returns `None` when the
    /// row was not in an open status.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        payment_required: bool,
    ) -> Result<Option<BookingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE booking_sessions SET
                status_id = $2,
                completed_at = NOW(),
                payment_required = $3,
                payment_status = CASE WHEN $3 THEN $6 ELSE payment_status END
             WHERE id = $1 AND status_id IN ($4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingSession>(&query)
            .bind(id)
            .bind(BookingStatus::Completed.id())
            .bind(payment_required)
            .bind(BookingStatus::Scheduled.id())
            .bind(BookingStatus::Confirmed.id())
            .bind(PAYMENT_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Record the outcome of a payment attempt for a completed session.
    pub async fn record_payment(
        pool: &PgPool,
        id: DbId,
        payment_status: &str,
        payment_reference: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE booking_sessions SET
                payment_status = $2,
                payment_reference = COALESCE($3, payment_reference)
             WHERE id = $1",
        )
        .bind(id)
        .bind(payment_status)
        .bind(payment_reference)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a session from any of `from` to `to`, stamping `cancelled_at` when
    /// cancelling. Returns `None` if the session was not in one of `from`.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: &[StatusId],
        to: BookingStatus,
    ) -> Result<Option<BookingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE booking_sessions SET
                status_id = $2,
                cancelled_at = CASE WHEN $2 = $4 THEN NOW() ELSE cancelled_at END
             WHERE id = $1 AND status_id = ANY($3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingSession>(&query)
            .bind(id)
            .bind(to.id())
            .bind(from)
            .bind(BookingStatus::Cancelled.id())
            .fetch_optional(pool)
            .await
    }

    /// Attach sessions booked by email before the client had an account.
    ///
    /// Returns the number of sessions linked.
    pub async fn link_email_to_user(
        pool: &PgPool,
        email: &str,
        user_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE booking_sessions SET user_id = $2
             WHERE user_id IS NULL AND lower(client_email) = lower($1)",
        )
        .bind(email)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
