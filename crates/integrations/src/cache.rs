//! Subscription snapshot cache.
//!
//! Snapshots are stored as JSON under `subscription:{customer_id}` with a
//! TTL, so a stale entry expires even if a webhook is missed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};
use ledgerwell_core::subscription::{cache_key, SubscriptionSnapshot};

use crate::IntegrationError;

#[async_trait]
pub trait SubscriptionCache: Send + Sync {
    async fn get(&self, customer_id: &str)
        -> Result<Option<SubscriptionSnapshot>, IntegrationError>;

    /// Write a snapshot, replacing any existing entry and resetting its TTL.
    async fn put(&self, snapshot: &SubscriptionSnapshot) -> Result<(), IntegrationError>;

    async fn invalidate(&self, customer_id: &str) -> Result<(), IntegrationError>;
}

// ---------------------------------------------------------------------------
// Redis
// ---------------------------------------------------------------------------

/// Redis-backed cache using a deadpool connection pool.
pub struct RedisSubscriptionCache {
    pool: Pool,
    ttl_secs: u64,
}

impl RedisSubscriptionCache {
    pub fn from_url(url: &str, ttl_secs: u64) -> Result<Self, IntegrationError> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| IntegrationError::Cache(e.to_string()))?;
        Ok(Self { pool, ttl_secs })
    }
}

#[async_trait]
impl SubscriptionCache for RedisSubscriptionCache {
    async fn get(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, IntegrationError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(cache_key(customer_id)).await?;

        match raw {
            None => Ok(None),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(snapshot) => Ok(Some(snapshot)),
                Err(e) => {
                    // Treat undecodable entries as a miss; the next sync overwrites them.
                    tracing::warn!(customer_id, error = %e, "Discarding undecodable cache entry");
                    Ok(None)
                }
            },
        }
    }

    async fn put(&self, snapshot: &SubscriptionSnapshot) -> Result<(), IntegrationError> {
        let value = serde_json::to_string(snapshot)?;
        let mut conn = self.pool.get().await?;
        let _: () = conn
            .set_ex(cache_key(&snapshot.customer_id), value, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, customer_id: &str) -> Result<(), IntegrationError> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(cache_key(customer_id)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

type CacheEntry = (SubscriptionSnapshot, Instant);

/// Process-local cache honouring the same TTL semantics.
pub struct MemorySubscriptionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemorySubscriptionCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SubscriptionCache for MemorySubscriptionCache {
    async fn get(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, IntegrationError> {
        let key = cache_key(customer_id);
        let mut entries = self.entries();
        let fresh = entries
            .get(&key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(snapshot, _)| snapshot.clone());
        if fresh.is_none() {
            entries.remove(&key);
        }
        Ok(fresh)
    }

    async fn put(&self, snapshot: &SubscriptionSnapshot) -> Result<(), IntegrationError> {
        let expires = Instant::now() + self.ttl;
        self.entries()
            .insert(cache_key(&snapshot.customer_id), (snapshot.clone(), expires));
        Ok(())
    }

    async fn invalidate(&self, customer_id: &str) -> Result<(), IntegrationError> {
        self.entries().remove(&cache_key(customer_id));
        Ok(())
    }
}
