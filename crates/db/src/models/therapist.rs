//! Therapist profile model and DTOs.

use ledgerwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const CALENDAR_DISCONNECTED: &str = "disconnected";
pub const CALENDAR_CONNECTED: &str = "connected";
pub const CALENDAR_ERROR: &str = "error";

/// Full row from the `therapists` table.
///
/// Contains calendar OAuth tokens -- NEVER serialize this to API responses
/// directly. Use [`TherapistResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Therapist {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub bio: Option<String>,
    pub hourly_rate_cents: i64,
    pub currency: String,
    pub session_length_minutes: i32,
    pub timezone: String,
    pub payment_account_id: Option<String>,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
    pub calendar_status: String,
    pub calendar_access_token: Option<String>,
    pub calendar_refresh_token: Option<String>,
    pub calendar_token_expires_at: Option<Timestamp>,
    pub scheduling_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe therapist representation for API responses (no tokens).
#[derive(Debug, Clone, Serialize)]
pub struct TherapistResponse {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub bio: Option<String>,
    pub hourly_rate_cents: i64,
    pub currency: String,
    pub session_length_minutes: i32,
    pub timezone: String,
    pub payment_connected: bool,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
    pub calendar_status: String,
    pub scheduling_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Therapist> for TherapistResponse {
    fn from(t: Therapist) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            display_name: t.display_name,
            bio: t.bio,
            hourly_rate_cents: t.hourly_rate_cents,
            currency: t.currency,
            session_length_minutes: t.session_length_minutes,
            timezone: t.timezone,
            payment_connected: t.payment_account_id.is_some(),
            charges_enabled: t.charges_enabled,
            payouts_enabled: t.payouts_enabled,
            details_submitted: t.details_submitted,
            calendar_status: t.calendar_status,
            scheduling_url: t.scheduling_url,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// DTO for creating a therapist profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTherapist {
    pub display_name: String,
    pub bio: Option<String>,
    pub hourly_rate_cents: Option<i64>,
    pub currency: Option<String>,
    pub session_length_minutes: Option<i32>,
    pub timezone: Option<String>,
    pub scheduling_url: Option<String>,
}

/// DTO for updating a therapist profile. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTherapist {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate_cents: Option<i64>,
    pub currency: Option<String>,
    pub session_length_minutes: Option<i32>,
    pub timezone: Option<String>,
    pub scheduling_url: Option<String>,
}

/// Payout capability flags reported by the payment processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PayoutCapabilities {
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

/// Calendar OAuth tokens to persist after a successful connect.
#[derive(Debug, Clone)]
pub struct CalendarCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Timestamp>,
}
