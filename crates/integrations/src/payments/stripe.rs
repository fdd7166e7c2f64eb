//! Stripe-compatible HTTP client.
//!
//! Requests are form-encoded against `base_url` (normally
//! `https://api.stripe.com/v1`) with the secret key as bearer token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerwell_core::subscription::{SubscriptionSnapshot, SubscriptionStatus};
use ledgerwell_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{AccountCapabilities, PaymentProcessor, SessionTransfer};
use crate::{ensure_success, IntegrationError};

const SERVICE: &str = "payments";

/// Payment processor client speaking the Stripe REST API.
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct IdObject {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct UrlObject {
    url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: Option<ListResponse<WireSubscriptionItem>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSubscriptionItem {
    pub price: Option<IdObject>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAccount {
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
}

impl WireSubscription {
    /// Convert into a snapshot. The period end moved from the subscription
    /// to its items in newer API versions; either location is accepted.
    pub(crate) fn into_snapshot(self, synced_at: DateTime<Utc>) -> SubscriptionSnapshot {
        let first_item = self.items.and_then(|items| items.data.into_iter().next());
        let period_end = self
            .current_period_end
            .or_else(|| first_item.as_ref().and_then(|i| i.current_period_end));

        SubscriptionSnapshot {
            customer_id: self.customer,
            subscription_id: Some(self.id),
            status: SubscriptionStatus::parse(&self.status),
            price_id: first_item.and_then(|i| i.price).map(|p| p.id),
            current_period_end: period_end.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            cancel_at_period_end: self.cancel_at_period_end,
            synced_at,
        }
    }
}

impl From<WireAccount> for AccountCapabilities {
    fn from(a: WireAccount) -> Self {
        Self {
            charges_enabled: a.charges_enabled,
            payouts_enabled: a.payouts_enabled,
            details_submitted: a.details_submitted,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl StripeClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        secret_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn key(&self) -> Result<&str, IntegrationError> {
        self.secret_key
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("payment processor"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, IntegrationError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(self.key()?)
            .query(query)
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        Ok(response.json().await?)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, IntegrationError> {
        let mut request = self
            .client
            .post(self.url(path))
            .bearer_auth(self.key()?)
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        let response = ensure_success(SERVICE, request.send().await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        user_id: DbId,
    ) -> Result<String, IntegrationError> {
        let mut form = vec![
            ("email", email.to_string()),
            ("metadata[user_id]", user_id.to_string()),
        ];
        if let Some(name) = name {
            form.push(("name", name.to_string()));
        }
        let customer: IdObject = self.post("customers", &form, None).await?;
        tracing::info!(customer_id = %customer.id, user_id, "Created payment customer");
        Ok(customer.id)
    }

    async fn fetch_subscription(
        &self,
        customer_id: &str,
    ) -> Result<SubscriptionSnapshot, IntegrationError> {
        let list: ListResponse<WireSubscription> = self
            .get(
                "subscriptions",
                &[("customer", customer_id), ("status", "all"), ("limit", "1")],
            )
            .await?;

        let now = Utc::now();
        Ok(match list.data.into_iter().next() {
            Some(sub) => sub.into_snapshot(now),
            None => SubscriptionSnapshot::empty(customer_id, now),
        })
    }

    async fn create_connected_account(
        &self,
        email: &str,
        therapist_id: DbId,
    ) -> Result<String, IntegrationError> {
        let form = vec![
            ("type", "express".to_string()),
            ("email", email.to_string()),
            ("capabilities[transfers][requested]", "true".to_string()),
            ("metadata[therapist_id]", therapist_id.to_string()),
        ];
        let account: IdObject = self.post("accounts", &form, None).await?;
        tracing::info!(account_id = %account.id, therapist_id, "Created connected account");
        Ok(account.id)
    }

    async fn account_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, IntegrationError> {
        let form = vec![
            ("account", account_id.to_string()),
            ("refresh_url", refresh_url.to_string()),
            ("return_url", return_url.to_string()),
            ("type", "account_onboarding".to_string()),
        ];
        let link: UrlObject = self.post("account_links", &form, None).await?;
        Ok(link.url)
    }

    async fn retrieve_account_capabilities(
        &self,
        account_id: &str,
    ) -> Result<AccountCapabilities, IntegrationError> {
        let account: WireAccount = self.get(&format!("accounts/{account_id}"), &[]).await?;
        Ok(account.into())
    }

    async fn transfer_session_payment(
        &self,
        transfer: &SessionTransfer,
    ) -> Result<String, IntegrationError> {
        let form = vec![
            ("amount", transfer.amount_cents.to_string()),
            ("currency", transfer.currency.clone()),
            ("destination", transfer.destination_account.clone()),
            (
                "metadata[booking_session_id]",
                transfer.booking_session_id.to_string(),
            ),
        ];
        let created: IdObject = self
            .post("transfers", &form, Some(&transfer.idempotency_key()))
            .await?;
        Ok(created.id)
    }
}
