//! Scheduling widget callbacks.
//!
//! The embedded widget posts JSON to the marketplace when an invitee books
//! or cancels. Bodies are signed with `hex(hmac_sha256(secret, body))` in
//! [`SIGNATURE_HEADER`].

use ledgerwell_core::types::DbId;
use serde::Deserialize;

pub const SIGNATURE_HEADER: &str = "x-scheduling-signature";

pub const EVENT_INVITEE_CREATED: &str = "invitee.created";
pub const EVENT_INVITEE_CANCELED: &str = "invitee.canceled";

/// Top-level callback envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingCallback {
    pub event: String,
    pub payload: SchedulingInvitee,
}

/// The booked invitee and event. Date/time fields are kept as strings and
/// resolved by the booking validation rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulingInvitee {
    /// Widget event id; repeated callbacks carry the same value.
    pub event_id: Option<String>,
    pub therapist_id: Option<DbId>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub session_date: Option<String>,
    pub start: Option<String>,
    pub session_type: Option<String>,
    pub join_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_is_decoded() {
        let callback: SchedulingCallback = serde_json::from_value(serde_json::json!({
            "event": "invitee.created",
            "payload": {
                "event_id": "evt_1",
                "therapist_id": 3,
                "email": "client@example.com",
                "start_time": "2026-03-02T15:00:00Z",
                "join_url": "https://meet.example.com/abc"
            }
        }))
        .unwrap();
        assert_eq!(callback.event, EVENT_INVITEE_CREATED);
        assert_eq!(callback.payload.therapist_id, Some(3));
        assert!(callback.payload.end_time.is_none());
    }
}
