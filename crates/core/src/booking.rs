//! Booking session status machine, completion eligibility and session pricing.
//!
//! Status IDs match the `booking_statuses` seed data (1-based SMALLSERIAL).
//! The db crate exposes the same values as `BookingStatus`; they are repeated
//! here because `core` must have zero internal deps.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_SCHEDULED: i16 = 1;
pub const STATUS_CONFIRMED: i16 = 2;
pub const STATUS_COMPLETED: i16 = 3;
pub const STATUS_CANCELLED: i16 = 4;

/// Statuses a session may still be completed from.
pub const OPEN_STATUSES: [i16; 2] = [STATUS_SCHEDULED, STATUS_CONFIRMED];

// ---------------------------------------------------------------------------
// Payment / source constants
// ---------------------------------------------------------------------------

pub const PAYMENT_PENDING: &str = "pending";
pub const PAYMENT_CAPTURED: &str = "captured";
pub const PAYMENT_FAILED: &str = "failed";

/// Booking created by the embedded scheduling widget callback.
pub const SOURCE_SCHEDULER: &str = "scheduler";
/// Booking created through the manual booking form.
pub const SOURCE_MANUAL: &str = "manual";

/// Session length used when a therapist has not configured one.
pub const DEFAULT_SESSION_MINUTES: i32 = 50;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::{STATUS_CANCELLED, STATUS_COMPLETED, STATUS_CONFIRMED, STATUS_SCHEDULED};

    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Completed and Cancelled are terminal and return an empty slice.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            STATUS_SCHEDULED => &[STATUS_CONFIRMED, STATUS_COMPLETED, STATUS_CANCELLED],
            STATUS_CONFIRMED => &[STATUS_COMPLETED, STATUS_CANCELLED],
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Whether no further transitions are possible from `status`.
    pub fn is_terminal(status: i16) -> bool {
        valid_transitions(status).is_empty()
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid transition: {} ({from}) -> {} ({to})",
                status_name(from),
                status_name(to)
            ))
        }
    }

    /// Human-readable name for a status ID.
    pub fn status_name(id: i16) -> &'static str {
        match id {
            STATUS_SCHEDULED => "scheduled",
            STATUS_CONFIRMED => "confirmed",
            STATUS_COMPLETED => "completed",
            STATUS_CANCELLED => "cancelled",
            _ => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Completion eligibility
// ---------------------------------------------------------------------------

/// A session is eligible for completion once its end time is strictly in the
/// past and it is neither completed nor cancelled.
///
/// Must stay in sync with `BookingSessionRepo::list_completion_eligible`.
pub fn is_completion_eligible(status_id: i16, end_time: Timestamp, now: Timestamp) -> bool {
    end_time < now && OPEN_STATUSES.contains(&status_id)
}

// ---------------------------------------------------------------------------
// Session type and pricing
// ---------------------------------------------------------------------------

/// Whether a session is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Free,
    Paid,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Free => "free",
            SessionType::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(SessionType::Free),
            "paid" => Some(SessionType::Paid),
            _ => None,
        }
    }

    /// Default type for a new booking: paid when the therapist charges.
    pub fn default_for_rate(hourly_rate_cents: i64) -> Self {
        if hourly_rate_cents > 0 {
            SessionType::Paid
        } else {
            SessionType::Free
        }
    }
}

/// Whether completing a session should trigger a payment.
pub fn requires_payment(hourly_rate_cents: i64, session_type: SessionType) -> bool {
    hourly_rate_cents > 0 && session_type == SessionType::Paid
}

/// Amount owed for a session, prorated from the hourly rate by the booked
/// duration and rounded half-up to the nearest cent.
///
/// Negative durations charge nothing. Returns `None` when the amount does
/// not fit in an `i64`.
pub fn session_charge_cents(
    hourly_rate_cents: i64,
    start: Timestamp,
    end: Timestamp,
) -> Option<i64> {
    let minutes = (end - start).num_minutes();
    if minutes <= 0 || hourly_rate_cents <= 0 {
        return Some(0);
    }
    let owed = hourly_rate_cents.checked_mul(minutes)?.checked_add(30)?;
    Some(owed / 60)
}

// ---------------------------------------------------------------------------
// Batch completion report
// ---------------------------------------------------------------------------

/// A single per-session failure in a completion batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletionFailure {
    pub booking_session_id: DbId,
    pub message: String,
}

/// Outcome of one completion batch. Failures are reported as data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionReport {
    /// Eligible sessions examined.
    pub processed: usize,
    /// Sessions transitioned to completed.
    pub completed: usize,
    /// Payments successfully captured.
    pub payments_captured: usize,
    pub errors: Vec<CompletionFailure>,
}

impl CompletionReport {
    pub fn record_error(&mut self, booking_session_id: DbId, message: impl Into<String>) {
        self.errors.push(CompletionFailure {
            booking_session_id,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::state_machine::*;
    use super::*;

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    #[test]
    fn scheduled_can_confirm_complete_or_cancel() {
        assert!(can_transition(STATUS_SCHEDULED, STATUS_CONFIRMED));
        assert!(can_transition(STATUS_SCHEDULED, STATUS_COMPLETED));
        assert!(can_transition(STATUS_SCHEDULED, STATUS_CANCELLED));
    }

    #[test]
    fn confirmed_cannot_go_back_to_scheduled() {
        assert!(!can_transition(STATUS_CONFIRMED, STATUS_SCHEDULED));
        assert!(can_transition(STATUS_CONFIRMED, STATUS_COMPLETED));
    }

    #[test]
    fn completed_and_cancelled_are_terminal() {
        assert!(is_terminal(STATUS_COMPLETED));
        assert!(is_terminal(STATUS_CANCELLED));
        assert!(!is_terminal(STATUS_CONFIRMED));
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = validate_transition(STATUS_COMPLETED, STATUS_CONFIRMED).unwrap_err();
        assert!(err.contains("completed (3)"));
        assert!(err.contains("confirmed (2)"));
    }

    // -----------------------------------------------------------------------
    // Eligibility
    // -----------------------------------------------------------------------

    #[test]
    fn confirmed_session_in_the_past_is_eligible() {
        assert!(is_completion_eligible(STATUS_CONFIRMED, at(9, 50), at(10, 0)));
        assert!(is_completion_eligible(STATUS_SCHEDULED, at(9, 50), at(10, 0)));
    }

    #[test]
    fn completed_session_is_not_eligible() {
        assert!(!is_completion_eligible(STATUS_COMPLETED, at(9, 50), at(10, 0)));
        assert!(!is_completion_eligible(STATUS_CANCELLED, at(9, 50), at(10, 0)));
    }

    #[test]
    fn future_or_exactly_now_end_time_is_not_eligible() {
        assert!(!is_completion_eligible(STATUS_CONFIRMED, at(10, 30), at(10, 0)));
        assert!(!is_completion_eligible(STATUS_CONFIRMED, at(10, 0), at(10, 0)));
    }

    // -----------------------------------------------------------------------
    // Pricing
    // -----------------------------------------------------------------------

    #[test]
    fn full_hour_charges_hourly_rate() {
        assert_eq!(session_charge_cents(12_000, at(9, 0), at(10, 0)), Some(12_000));
    }

    #[test]
    fn fifty_minutes_is_prorated_and_rounded() {
        // 10_001 * 50 / 60 = 8334.17 -> 8334
        assert_eq!(session_charge_cents(10_001, at(9, 0), at(9, 50)), Some(8_334));
        // 100 * 45 / 60 = 75
        assert_eq!(session_charge_cents(100, at(9, 0), at(9, 45)), Some(75));
    }

    #[test]
    fn zero_rate_or_inverted_range_charges_nothing() {
        assert_eq!(session_charge_cents(0, at(9, 0), at(10, 0)), Some(0));
        assert_eq!(session_charge_cents(12_000, at(10, 0), at(9, 0)), Some(0));
        assert_eq!(
            session_charge_cents(12_000, at(10, 0), at(10, 0) + Duration::seconds(30)),
            Some(0)
        );
    }

    #[test]
    fn oversized_charge_is_reported_not_wrapped() {
        let start = at(9, 0);
        assert_eq!(
            session_charge_cents(i64::MAX / 2, start, start + Duration::minutes(50)),
            None
        );
        assert_eq!(
            session_charge_cents(12_000, start, start + Duration::days(365 * 10)),
            Some(12_000 * 24 * 365 * 10)
        );
    }

    #[test]
    fn payment_required_only_for_paid_sessions_with_rate() {
        assert!(requires_payment(5_000, SessionType::Paid));
        assert!(!requires_payment(5_000, SessionType::Free));
        assert!(!requires_payment(0, SessionType::Paid));
    }

    #[test]
    fn default_session_type_follows_rate() {
        assert_eq!(SessionType::default_for_rate(0), SessionType::Free);
        assert_eq!(SessionType::default_for_rate(1), SessionType::Paid);
        assert_eq!(SessionType::parse("paid"), Some(SessionType::Paid));
        assert_eq!(SessionType::parse("PAID"), None);
    }

    #[test]
    fn report_collects_errors() {
        let mut report = CompletionReport::default();
        assert!(!report.has_errors());
        report.record_error(7, "payment failed");
        assert!(report.has_errors());
        assert_eq!(report.errors[0].booking_session_id, 7);
    }
}
