//! Subscription status as mirrored from the payment processor.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Processor subscription status.
///
/// Serialized with the processor's own snake_case names so cached snapshots
/// can be compared directly against webhook payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Unpaid,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Paused,
    /// The customer has no subscription at all.
    None,
}

impl SubscriptionStatus {
    /// Parse a processor status string. Unknown values map to `None`.
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "unpaid" => Self::Unpaid,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Unpaid => "unpaid",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
            Self::None => "none",
        }
    }

    /// Whether the status grants access to paid employer features.
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Canonical subscription state for one processor customer, as written to the
/// cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub synced_at: Timestamp,
}

impl SubscriptionSnapshot {
    /// Snapshot for a customer with no subscription.
    pub fn empty(customer_id: impl Into<String>, synced_at: Timestamp) -> Self {
        Self {
            customer_id: customer_id.into(),
            subscription_id: None,
            status: SubscriptionStatus::None,
            price_id: None,
            current_period_end: None,
            cancel_at_period_end: false,
            synced_at,
        }
    }
}

/// Cache key for a customer's subscription snapshot.
pub fn cache_key(customer_id: &str) -> String {
    format!("subscription:{customer_id}")
}
