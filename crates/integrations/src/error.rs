/// Failure talking to an external platform.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service returned a non-2xx status code.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A response or payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The integration has no credentials configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<deadpool_redis::PoolError> for IntegrationError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for IntegrationError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for IntegrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
