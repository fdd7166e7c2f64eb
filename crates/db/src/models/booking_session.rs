//! Booking session model and DTOs.

use chrono::NaiveDate;
use ledgerwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::status::StatusId;

/// A row from the `booking_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingSession {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub client_email: Option<String>,
    pub therapist_id: DbId,
    pub session_date: NaiveDate,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status_id: StatusId,
    pub session_type: String,
    pub payment_required: bool,
    pub payment_status: Option<String>,
    pub payment_reference: Option<String>,
    pub source: String,
    pub external_event_id: Option<String>,
    pub metadata: serde_json::Value,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Validated insert DTO. Handlers build this after resolving dates and the
/// client; it is never deserialized straight from a request.
#[derive(Debug, Clone)]
pub struct CreateBookingSession {
    pub user_id: Option<DbId>,
    pub client_email: Option<String>,
    pub therapist_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub session_type: String,
    pub source: String,
    pub external_event_id: Option<String>,
    pub metadata: serde_json::Value,
}

/// A session selected for completion, joined with the billing fields of its
/// therapist.
#[derive(Debug, Clone, FromRow)]
pub struct CompletionCandidate {
    pub id: DbId,
    pub therapist_id: DbId,
    pub user_id: Option<DbId>,
    pub status_id: StatusId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub session_type: String,
    pub hourly_rate_cents: i64,
    pub currency: String,
    pub payment_account_id: Option<String>,
}

/// Filter for listing bookings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub user_id: Option<DbId>,
    pub therapist_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
