use std::sync::Arc;

use ledgerwell_events::EventBus;
use ledgerwell_integrations::cache::SubscriptionCache;
use ledgerwell_integrations::calendar::CalendarProvider;
use ledgerwell_integrations::identity::IdentityProvider;
use ledgerwell_integrations::payments::PaymentProcessor;
use ledgerwell_integrations::storage::ObjectStorage;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is a pool handle or behind `Arc`. External
/// platforms sit behind trait objects so tests can swap in memory doubles.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ledgerwell_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub subscription_cache: Arc<dyn SubscriptionCache>,
    pub identity: Arc<dyn IdentityProvider>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub storage: Arc<dyn ObjectStorage>,
}
