//! Ledgerwell domain event bus.
//!
//! - [`EventBus`] is an in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] is the canonical domain event envelope.
//! - [`EventLogger`] is a background subscriber that writes every event to
//!   the tracing pipeline.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, PlatformEvent};
pub use logger::EventLogger;

/// Well-known event type names.
pub mod event_types {
    pub const BOOKING_CREATED: &str = "booking.created";
    pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const SESSION_COMPLETED: &str = "session.completed";
    pub const SUBSCRIPTION_SYNCED: &str = "subscription.synced";
    pub const THERAPIST_PAYMENTS_DISCONNECTED: &str = "therapist.payments_disconnected";
    pub const USER_ONBOARDED: &str = "user.onboarded";
}
