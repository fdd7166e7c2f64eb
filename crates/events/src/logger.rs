//! Tracing sink for domain events.
//!
//! [`EventLogger`] subscribes to the bus and emits one structured log line
//! per event, so every domain event lands in the same log pipeline as the
//! request traces.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::PlatformEvent;

/// Background service that logs platform events.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until `cancel` fires or the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<PlatformEvent>, cancel: CancellationToken) {
        tracing::info!("Event logger started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event logger stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => Self::log(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Event logger lagged, some events were not logged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, event logger shutting down");
                        break;
                    }
                },
            }
        }
    }

    fn log(event: &PlatformEvent) {
        tracing::info!(
            target: "ledgerwell_events",
            event_type = %event.event_type,
            source_entity_type = event.source_entity_type.as_deref().unwrap_or(""),
            source_entity_id = event.source_entity_id,
            actor_user_id = event.actor_user_id,
            payload = %event.payload,
            "Domain event"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn stops_on_cancellation() {
        let bus = EventBus::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(EventLogger::run(bus.subscribe(), cancel.clone()));

        bus.publish(PlatformEvent::new("booking.created"));
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("logger should stop promptly")
            .expect("logger task should not panic");
    }

    #[tokio::test]
    async fn stops_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLogger::run(bus.subscribe(), CancellationToken::new()));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("logger should stop when the channel closes")
            .expect("logger task should not panic");
    }
}
