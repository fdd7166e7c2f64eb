//! Calendar provider integration: OAuth code exchange, token refresh and
//! free/busy lookups used to block out availability slots.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ledgerwell_core::availability::Interval;
use ledgerwell_core::types::Timestamp;
use serde::Deserialize;

use crate::{ensure_success, IntegrationError};

const SERVICE: &str = "calendar";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FREEBUSY_URL: &str = "https://www.googleapis.com/calendar/v3/freeBusy";

/// OAuth tokens returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Timestamp>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Exchange an OAuth authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<CalendarTokens, IntegrationError>;

    async fn refresh(&self, refresh_token: &str) -> Result<CalendarTokens, IntegrationError>;

    /// Busy intervals on the primary calendar within `[from, to)`.
    async fn busy_intervals(
        &self,
        access_token: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Interval>, IntegrationError>;
}

// ---------------------------------------------------------------------------
// Google Calendar
// ---------------------------------------------------------------------------

/// OAuth client credentials for the calendar provider.
#[derive(Debug, Clone)]
pub struct CalendarOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    oauth: Option<CalendarOAuthConfig>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TokenResponse {
    fn into_tokens(self, now: Timestamp) -> CalendarTokens {
        CalendarTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

impl GoogleCalendarClient {
    pub fn new(client: reqwest::Client, oauth: Option<CalendarOAuthConfig>) -> Self {
        Self { client, oauth }
    }

    fn oauth(&self) -> Result<&CalendarOAuthConfig, IntegrationError> {
        self.oauth
            .as_ref()
            .ok_or(IntegrationError::NotConfigured("calendar provider"))
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<CalendarTokens, IntegrationError> {
        let response = self.client.post(TOKEN_URL).form(params).send().await?;
        let response = ensure_success(SERVICE, response).await?;
        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into_tokens(Utc::now()))
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn exchange_code(&self, code: &str) -> Result<CalendarTokens, IntegrationError> {
        let oauth = self.oauth()?;
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &oauth.redirect_uri),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CalendarTokens, IntegrationError> {
        let oauth = self.oauth()?;
        let mut tokens = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &oauth.client_id),
                ("client_secret", &oauth.client_secret),
            ])
            .await?;
        // Refresh responses usually omit the refresh token; keep the old one.
        tokens.refresh_token.get_or_insert_with(|| refresh_token.to_string());
        Ok(tokens)
    }

    async fn busy_intervals(
        &self,
        access_token: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Interval>, IntegrationError> {
        let response = self
            .client
            .post(FREEBUSY_URL)
            .bearer_auth(access_token)
            .json(&serde_json::json!({
                "timeMin": from.to_rfc3339(),
                "timeMax": to.to_rfc3339(),
                "items": [{ "id": "primary" }],
            }))
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        let body: FreeBusyResponse = response.json().await?;

        Ok(body
            .calendars
            .into_values()
            .flat_map(|c| c.busy)
            .map(|b| Interval::new(b.start, b.end))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Calendar double with configurable busy times and failure mode.
#[derive(Default)]
pub struct MemoryCalendarProvider {
    busy: Mutex<Vec<Interval>>,
    failing: Mutex<bool>,
}

impl MemoryCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_busy(&self, busy: Vec<Interval>) {
        *self.busy.lock().unwrap_or_else(|p| p.into_inner()) = busy;
    }

    /// Make every subsequent call fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|p| p.into_inner()) = failing;
    }

    fn check(&self) -> Result<(), IntegrationError> {
        if *self.failing.lock().unwrap_or_else(|p| p.into_inner()) {
            return Err(IntegrationError::Status {
                service: SERVICE,
                status: 503,
                body: "calendar unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarProvider for MemoryCalendarProvider {
    async fn exchange_code(&self, code: &str) -> Result<CalendarTokens, IntegrationError> {
        self.check()?;
        Ok(CalendarTokens {
            access_token: format!("access-{code}"),
            refresh_token: Some(format!("refresh-{code}")),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CalendarTokens, IntegrationError> {
        self.check()?;
        Ok(CalendarTokens {
            access_token: format!("access-from-{refresh_token}"),
            refresh_token: Some(refresh_token.to_string()),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        })
    }

    async fn busy_intervals(
        &self,
        _access_token: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Interval>, IntegrationError> {
        self.check()?;
        let window = Interval::new(from, to);
        Ok(self
            .busy
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|b| b.overlaps(&window))
            .copied()
            .collect())
    }
}
