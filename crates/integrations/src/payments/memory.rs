//! In-memory payment processor for tests and local development.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use ledgerwell_core::subscription::SubscriptionSnapshot;
use ledgerwell_core::types::DbId;

use super::{AccountCapabilities, PaymentProcessor, SessionTransfer};
use crate::IntegrationError;

#[derive(Default)]
struct State {
    next_id: u64,
    customers: HashMap<String, String>,
    subscriptions: HashMap<String, SubscriptionSnapshot>,
    capabilities: HashMap<String, AccountCapabilities>,
    declined_accounts: HashSet<String>,
    subscriptions_unavailable: bool,
    transfers: Vec<SessionTransfer>,
}

/// Records every call and answers from configurable in-memory state.
#[derive(Default)]
pub struct MemoryPaymentProcessor {
    state: Mutex<State>,
}

impl MemoryPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the subscription the processor reports for a customer.
    pub fn set_subscription(&self, snapshot: SubscriptionSnapshot) {
        self.state()
            .subscriptions
            .insert(snapshot.customer_id.clone(), snapshot);
    }

    pub fn set_capabilities(&self, account_id: &str, caps: AccountCapabilities) {
        self.state().capabilities.insert(account_id.to_string(), caps);
    }

    /// Make every transfer to `account_id` fail.
    pub fn decline_transfers_to(&self, account_id: &str) {
        self.state().declined_accounts.insert(account_id.to_string());
    }

    /// Make subscription lookups fail as if the processor were down.
    pub fn set_subscriptions_unavailable(&self, unavailable: bool) {
        self.state().subscriptions_unavailable = unavailable;
    }

    /// Transfers accepted so far.
    pub fn transfers(&self) -> Vec<SessionTransfer> {
        self.state().transfers.clone()
    }

    /// Email of a customer created through this processor.
    pub fn customer_email(&self, customer_id: &str) -> Option<String> {
        self.state().customers.get(customer_id).cloned()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.next_id += 1;
        format!("{prefix}_{}", state.next_id)
    }
}

#[async_trait]
impl PaymentProcessor for MemoryPaymentProcessor {
    async fn create_customer(
        &self,
        email: &str,
        _name: Option<&str>,
        _user_id: DbId,
    ) -> Result<String, IntegrationError> {
        let id = self.next_id("cus");
        self.state().customers.insert(id.clone(), email.to_string());
        Ok(id)
    }

    async fn fetch_subscription(
        &self,
        customer_id: &str,
    ) -> Result<SubscriptionSnapshot, IntegrationError> {
        let now = Utc::now();
        let state = self.state();
        if state.subscriptions_unavailable {
            return Err(IntegrationError::Status {
                service: "payments",
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(match state.subscriptions.get(customer_id) {
            Some(snapshot) => SubscriptionSnapshot {
                synced_at: now,
                ..snapshot.clone()
            },
            None => SubscriptionSnapshot::empty(customer_id, now),
        })
    }

    async fn create_connected_account(
        &self,
        _email: &str,
        _therapist_id: DbId,
    ) -> Result<String, IntegrationError> {
        let id = self.next_id("acct");
        self.state()
            .capabilities
            .insert(id.clone(), AccountCapabilities::default());
        Ok(id)
    }

    async fn account_onboarding_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        return_url: &str,
    ) -> Result<String, IntegrationError> {
        Ok(format!("https://connect.invalid/onboarding/{account_id}?return={return_url}"))
    }

    async fn retrieve_account_capabilities(
        &self,
        account_id: &str,
    ) -> Result<AccountCapabilities, IntegrationError> {
        Ok(self
            .state()
            .capabilities
            .get(account_id)
            .copied()
            .unwrap_or_default())
    }

    async fn transfer_session_payment(
        &self,
        transfer: &SessionTransfer,
    ) -> Result<String, IntegrationError> {
        if self
            .state()
            .declined_accounts
            .contains(&transfer.destination_account)
        {
            return Err(IntegrationError::Status {
                service: "payments",
                status: 402,
                body: format!("transfers to {} are declined", transfer.destination_account),
            });
        }
        let reference = self.next_id("tr");
        self.state().transfers.push(transfer.clone());
        Ok(reference)
    }
}
