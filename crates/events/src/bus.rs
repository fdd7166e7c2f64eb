//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Share it as `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use ledgerwell_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"booking.created"`.
    pub event_type: String,

    /// Optional source entity kind (e.g. `"booking_session"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// Optional id of the user that triggered the event.
    pub actor_user_id: Option<DbId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    /// Attach the acting user. `None` leaves the event system-initiated.
    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use ledgerwell_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("booking.created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is subscribed.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            PlatformEvent::new("booking.created")
                .with_source("booking_session", 42)
                .with_actor(Some(7))
                .with_payload(serde_json::json!({"therapist_id": 3})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "booking.created");
        assert_eq!(received.source_entity_type.as_deref(), Some("booking_session"));
        assert_eq!(received.source_entity_id, Some(42));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.payload["therapist_id"], 3);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(PlatformEvent::new("session.completed"));

        assert_eq!(rx1.recv().await.unwrap().event_type, "session.completed");
        assert_eq!(rx2.recv().await.unwrap().event_type, "session.completed");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(PlatformEvent::new("orphan.event"));
    }

    #[test]
    fn system_events_have_no_actor() {
        let event = PlatformEvent::new("session.completed").with_actor(None);
        assert!(event.actor_user_id.is_none());
        assert!(event.payload.is_object());
    }
}
