//! Payment processor webhooks: signature verification and event decoding.
//!
//! The signature header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`,
//! where each `v1` is `hex(hmac_sha256(secret, "<t>.<raw body>"))`.

use ledgerwell_core::hashing::{hmac_sha256_hex, verify_hmac_sha256_hex};
use serde::Deserialize;

use super::stripe::WireAccount;
use super::AccountCapabilities;
use crate::IntegrationError;

/// Header carrying the processor signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum allowed clock difference between the signature timestamp and now.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header is malformed")]
    Malformed,

    #[error("Signature timestamp is outside the tolerance window")]
    Expired,

    #[error("No signature matches the payload")]
    Mismatch,
}

/// Verify a webhook signature header against the raw request body.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    let signed = signed_payload(timestamp, payload);
    if signatures
        .iter()
        .any(|sig| verify_hmac_sha256_hex(secret.as_bytes(), &signed, sig))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a signature header for `payload`. Used by tests and local tooling
/// that replay processor events.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = hmac_sha256_hex(secret.as_bytes(), &signed_payload(timestamp, payload));
    format!("t={timestamp},v1={signature}")
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    signed
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AccountObject {
    id: String,
    #[serde(flatten)]
    flags: WireAccount,
}

/// What a webhook asks the marketplace to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// A customer's subscription changed; the cached snapshot must be
    /// refreshed from the processor.
    SubscriptionChanged { customer_id: String },
    /// A connected account's payout capabilities changed.
    AccountUpdated {
        account_id: String,
        capabilities: AccountCapabilities,
    },
    /// Any other event type. Acknowledged without action.
    Ignored,
}

/// A decoded processor webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentWebhookEvent {
    pub id: String,
    pub event_type: String,
    pub kind: PaymentEventKind,
}

impl PaymentWebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, IntegrationError> {
        let envelope: Envelope = serde_json::from_slice(payload)?;

        let kind = match envelope.event_type.as_str() {
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => PaymentEventKind::SubscriptionChanged {
                customer_id: customer_id(&envelope.data.object).ok_or_else(|| {
                    IntegrationError::Decode("subscription event without customer".to_string())
                })?,
            },
            "account.updated" => {
                let account: AccountObject = serde_json::from_value(envelope.data.object)?;
                PaymentEventKind::AccountUpdated {
                    account_id: account.id,
                    capabilities: account.flags.into(),
                }
            }
            _ => PaymentEventKind::Ignored,
        };

        Ok(Self {
            id: envelope.id,
            event_type: envelope.event_type,
            kind,
        })
    }
}

/// `customer` is either an id string or an expanded object.
fn customer_id(object: &serde_json::Value) -> Option<String> {
    match object.get("customer")? {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Object(map) => map.get("id")?.as_str().map(str::to_string),
        _ => None,
    }
}
