//! Object storage for therapist documents.
//!
//! Clients upload and download directly against presigned URLs; the API
//! only hands out URLs and deletes objects.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::Utc;
use ledgerwell_core::types::Timestamp;
use serde::Serialize;

use crate::IntegrationError;

/// A time-limited URL granting one kind of access to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: Timestamp,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_secs: u64,
    ) -> Result<PresignedUrl, IntegrationError>;

    async fn presign_download(
        &self,
        key: &str,
        expires_secs: u64,
    ) -> Result<PresignedUrl, IntegrationError>;

    async fn delete(&self, key: &str) -> Result<(), IntegrationError>;
}

/// Presigned URLs are valid for at most one week.
const MAX_EXPIRY_SECS: u64 = 7 * 24 * 3600;

fn expires_at(expires_secs: u64) -> Timestamp {
    Utc::now() + chrono::Duration::seconds(expires_secs.min(MAX_EXPIRY_SECS) as i64)
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the standard AWS environment (credentials,
    /// region, endpoint overrides).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }

    fn presigning(expires_secs: u64) -> Result<PresigningConfig, IntegrationError> {
        PresigningConfig::expires_in(Duration::from_secs(expires_secs))
            .map_err(|e| IntegrationError::Storage(e.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_secs: u64,
    ) -> Result<PresignedUrl, IntegrationError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning(expires_secs)?)
            .await
            .map_err(|e| IntegrationError::Storage(DisplayErrorContext(e).to_string()))?;

        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at: expires_at(expires_secs),
        })
    }

    async fn presign_download(
        &self,
        key: &str,
        expires_secs: u64,
    ) -> Result<PresignedUrl, IntegrationError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(expires_secs)?)
            .await
            .map_err(|e| IntegrationError::Storage(DisplayErrorContext(e).to_string()))?;

        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at: expires_at(expires_secs),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), IntegrationError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IntegrationError::Storage(DisplayErrorContext(e).to_string()))?;
        tracing::debug!(bucket = %self.bucket, key, "Deleted object");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Tracks which keys have been handed upload URLs.
#[derive(Default)]
pub struct MemoryStorage {
    keys: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(key)
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn presign_upload(
        &self,
        key: &str,
        _content_type: &str,
        expires_secs: u64,
    ) -> Result<PresignedUrl, IntegrationError> {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string());
        Ok(PresignedUrl {
            url: format!("memory://documents/{key}?op=put"),
            expires_at: expires_at(expires_secs),
        })
    }

    async fn presign_download(
        &self,
        key: &str,
        expires_secs: u64,
    ) -> Result<PresignedUrl, IntegrationError> {
        if !self.contains(key) {
            return Err(IntegrationError::Storage(format!("no such object: {key}")));
        }
        Ok(PresignedUrl {
            url: format!("memory://documents/{key}?op=get"),
            expires_at: expires_at(expires_secs),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), IntegrationError> {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key);
        Ok(())
    }
}
