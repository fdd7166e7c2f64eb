use std::str::FromStr;

use ledgerwell_integrations::calendar::CalendarOAuthConfig;

/// Server configuration loaded from environment variables.
///
/// Optional integrations fall back to in-process implementations when their
/// credentials are absent, so local development only needs the secrets.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Base URL of the web app, used for onboarding return links.
    pub app_base_url: String,
    /// Shared secret the external scheduler presents to trigger completion.
    pub cron_secret: String,
    /// Interval of the in-process completion loop. `0` disables it.
    pub session_completion_interval_secs: u64,
    /// HMAC secret for scheduling widget callbacks.
    pub scheduling_webhook_secret: String,
    /// Object storage bucket for therapist documents.
    pub s3_bucket: Option<String>,
    pub identity: IdentityConfig,
    pub payments: PaymentsConfig,
    pub cache: CacheConfig,
    pub calendar: Option<CalendarOAuthConfig>,
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// HS256 secret used to verify session tokens.
    pub jwt_secret: String,
    pub api_url: String,
    /// Backend API key for metadata writes.
    pub secret_key: Option<String>,
    pub webhook_secret: String,
}

/// Payment processor settings.
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub api_url: String,
    pub secret_key: Option<String>,
    pub webhook_secret: String,
    /// Currency used for session transfers when a therapist has none.
    pub currency: String,
}

/// Subscription cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
}

const DEFAULT_IDENTITY_API_URL: &str = "https://api.clerk.com/v1";
const DEFAULT_PAYMENTS_API_URL: &str = "https://api.stripe.com/v1";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default                     |
    /// |------------------------------------|-----------------------------|
    /// | `HOST`                             | `0.0.0.0`                   |
    /// | `PORT`                             | `3000`                      |
    /// | `CORS_ORIGINS`                     | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`             | `30`                        |
    /// | `APP_BASE_URL`                     | `http://localhost:5173`     |
    /// | `CRON_SECRET`                      | **required**                |
    /// | `SESSION_COMPLETION_INTERVAL_SECS` | `0` (off)                   |
    /// | `SCHEDULING_WEBHOOK_SECRET`        | **required**                |
    /// | `S3_BUCKET`                        | unset (memory storage)      |
    /// | `IDENTITY_JWT_SECRET`              | **required**                |
    /// | `IDENTITY_API_URL`                 | `https://api.clerk.com/v1`  |
    /// | `IDENTITY_SECRET_KEY`              | unset (metadata sync off)   |
    /// | `IDENTITY_WEBHOOK_SECRET`          | **required**                |
    /// | `PAYMENTS_API_URL`                 | `https://api.stripe.com/v1` |
    /// | `PAYMENTS_SECRET_KEY`              | unset                       |
    /// | `PAYMENTS_WEBHOOK_SECRET`          | **required**                |
    /// | `PAYMENTS_CURRENCY`                | `usd`                       |
    /// | `REDIS_URL`                        | unset (memory cache)        |
    /// | `CACHE_TTL_SECS`                   | `3600`                      |
    /// | `CALENDAR_CLIENT_ID` / `_SECRET` / `_REDIRECT_URI` | unset       |
    ///
    /// # Panics
    ///
    /// Panics if a required secret is missing or a numeric value is malformed.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parsed("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parsed("REQUEST_TIMEOUT_SECS", 30);

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let identity = IdentityConfig {
            jwt_secret: required("IDENTITY_JWT_SECRET"),
            api_url: std::env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_API_URL.into()),
            secret_key: optional("IDENTITY_SECRET_KEY"),
            webhook_secret: required("IDENTITY_WEBHOOK_SECRET"),
        };

        let payments = PaymentsConfig {
            api_url: std::env::var("PAYMENTS_API_URL")
                .unwrap_or_else(|_| DEFAULT_PAYMENTS_API_URL.into()),
            secret_key: optional("PAYMENTS_SECRET_KEY"),
            webhook_secret: required("PAYMENTS_WEBHOOK_SECRET"),
            currency: std::env::var("PAYMENTS_CURRENCY")
                .unwrap_or_else(|_| "usd".into())
                .to_lowercase(),
        };

        let cache = CacheConfig {
            redis_url: optional("REDIS_URL"),
            ttl_secs: parsed("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        };

        // All three values are needed for the OAuth flow.
        let calendar = match (
            optional("CALENDAR_CLIENT_ID"),
            optional("CALENDAR_CLIENT_SECRET"),
            optional("CALENDAR_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => {
                Some(CalendarOAuthConfig {
                    client_id,
                    client_secret,
                    redirect_uri,
                })
            }
            _ => None,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            app_base_url,
            cron_secret: required("CRON_SECRET"),
            session_completion_interval_secs: parsed("SESSION_COMPLETION_INTERVAL_SECS", 0),
            scheduling_webhook_secret: required("SCHEDULING_WEBHOOK_SECRET"),
            s3_bucket: optional("S3_BUCKET"),
            identity,
            payments,
            cache,
            calendar,
        }
    }
}

fn required(name: &str) -> String {
    let value =
        std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set in the environment"));
    assert!(!value.trim().is_empty(), "{name} must not be empty");
    value
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        Err(_) => default,
    }
}
