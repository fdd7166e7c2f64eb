//! Identity provider integration.
//!
//! Authentication itself happens at the provider; the marketplace only
//! writes public metadata (role, onboarding state) back so the provider's
//! session claims stay in sync with the local user row.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{ensure_success, IntegrationError};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Merge `metadata` into the user's public metadata.
    async fn update_public_metadata(
        &self,
        external_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), IntegrationError>;
}

/// REST client for the identity provider's backend API.
///
/// Without a secret key metadata writes are skipped with a warning, which
/// keeps local development usable without provider credentials.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

impl HttpIdentityProvider {
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
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn update_public_metadata(
        &self,
        external_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), IntegrationError> {
        let Some(secret_key) = self.secret_key.as_deref() else {
            tracing::warn!(external_id, "Identity provider not configured, skipping metadata sync");
            return Ok(());
        };

        let response = self
            .client
            .patch(format!("{}/users/{external_id}/metadata", self.base_url))
            .bearer_auth(secret_key)
            .json(&serde_json::json!({ "public_metadata": metadata }))
            .send()
            .await?;
        ensure_success("identity", response).await?;

        tracing::debug!(external_id, "Synced identity metadata");
        Ok(())
    }
}

/// Records metadata writes in memory.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    metadata: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current public metadata for a user, if any was written.
    pub fn metadata_for(&self, external_id: &str) -> Option<serde_json::Value> {
        self.metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(external_id)
            .cloned()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn update_public_metadata(
        &self,
        external_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), IntegrationError> {
        let mut all = self
            .metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = all
            .entry(external_id.to_string())
            .or_insert_with(|| serde_json::json!({}));

        if let (Some(existing), serde_json::Value::Object(update)) =
            (entry.as_object_mut(), metadata)
        {
            existing.extend(update);
        }
        Ok(())
    }
}
