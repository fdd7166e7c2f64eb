//! Payment processor integration.
//!
//! [`PaymentProcessor`] covers the four processor concerns the marketplace
//! needs: employer customers and their subscriptions, therapist connected
//! accounts, and per-session transfers to those accounts.

use async_trait::async_trait;
use ledgerwell_core::subscription::SubscriptionSnapshot;
use ledgerwell_core::types::DbId;
use serde::Serialize;

use crate::IntegrationError;

pub mod memory;
pub mod stripe;
pub mod webhook;

pub use memory::MemoryPaymentProcessor;
pub use stripe::StripeClient;

/// Payout capability flags reported for a connected account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountCapabilities {
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

/// A transfer of a completed session's fee to the therapist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTransfer {
    pub booking_session_id: DbId,
    pub destination_account: String,
    pub amount_cents: i64,
    pub currency: String,
}

impl SessionTransfer {
    /// Idempotency key so a retried completion never pays twice.
    pub fn idempotency_key(&self) -> String {
        format!("booking-session-{}-transfer", self.booking_session_id)
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a processor customer, returning its id.
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        user_id: DbId,
    ) -> Result<String, IntegrationError>;

    /// Fetch the canonical subscription state for a customer.
    async fn fetch_subscription(
        &self,
        customer_id: &str,
    ) -> Result<SubscriptionSnapshot, IntegrationError>;

    /// Create a connected account for a therapist, returning its id.
    async fn create_connected_account(
        &self,
        email: &str,
        therapist_id: DbId,
    ) -> Result<String, IntegrationError>;

    /// Hosted onboarding link for a connected account.
    async fn account_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, IntegrationError>;

    async fn retrieve_account_capabilities(
        &self,
        account_id: &str,
    ) -> Result<AccountCapabilities, IntegrationError>;

    /// Transfer a session fee, returning the processor's transfer reference.
    async fn transfer_session_payment(
        &self,
        transfer: &SessionTransfer,
    ) -> Result<String, IntegrationError>;
}
