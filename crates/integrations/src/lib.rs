//! Clients for the external platforms the marketplace depends on.
//!
//! Every platform sits behind an `async_trait` seam so handlers hold
//! `Arc<dyn Trait>` and tests can swap in the in-memory implementations:
//!
//! - [`payments::PaymentProcessor`]: customers, subscriptions, connected
//!   accounts and transfers.
//! - [`cache::SubscriptionCache`]: subscription snapshots keyed by customer.
//! - [`identity::IdentityProvider`]: public metadata writes.
//! - [`calendar::CalendarProvider`]: OAuth code exchange and busy times.
//! - [`storage::ObjectStorage`]: presigned document URLs.
//! - [`scheduling`]: scheduling widget callback payloads.

use std::time::Duration;

pub mod cache;
pub mod calendar;
pub mod error;
pub mod identity;
pub mod payments;
pub mod scheduling;
pub mod storage;

pub use error::IntegrationError;

/// HTTP request timeout for a single call to an external platform.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the shared HTTP client used by every HTTP-backed integration.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build reqwest HTTP client")
}

/// Turn a non-2xx response into [`IntegrationError::Status`], keeping the
/// body for the logs.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}
