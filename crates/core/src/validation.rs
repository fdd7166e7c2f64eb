//! Input validation for booking submissions.
//!
//! Bookings arrive from two places (the scheduling widget callback and the
//! manual booking form) with loosely-typed date/time fields. These helpers
//! turn them into concrete timestamps or a [`CoreError::Validation`].

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use validator::ValidateEmail;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Require a therapist id on a booking submission.
pub fn require_therapist_id(therapist_id: Option<DbId>) -> Result<DbId, CoreError> {
    match therapist_id {
        Some(id) if id > 0 => Ok(id),
        Some(id) => Err(CoreError::Validation(format!("invalid therapist_id: {id}"))),
        None => Err(CoreError::Validation("therapist_id is required".to_string())),
    }
}

/// Validate and normalise an email address (trimmed, lowercased).
pub fn normalize_email(email: &str) -> Result<String, CoreError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("email must not be empty".to_string()));
    }
    if !trimmed.validate_email() {
        return Err(CoreError::Validation(format!(
            "invalid email address: {trimmed}"
        )));
    }
    Ok(trimmed.to_lowercase())
}

/// Resolve a session start timestamp.
///
/// Accepts either a full RFC 3339 `start_time`, or a `session_date`
/// (`YYYY-MM-DD`) combined with a `start` time (`HH:MM` or `HH:MM:SS`, UTC).
/// `start_time` wins when both are given.
pub fn resolve_start_time(
    start_time: Option<&str>,
    session_date: Option<&str>,
    start: Option<&str>,
) -> Result<Timestamp, CoreError> {
    if let Some(raw) = start_time.map(str::trim).filter(|s| !s.is_empty()) {
        return parse_rfc3339(raw, "start_time");
    }

    let (Some(date), Some(time)) = (
        session_date.map(str::trim).filter(|s| !s.is_empty()),
        start.map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(CoreError::Validation(
            "session date is required: provide start_time, or session_date and start".to_string(),
        ));
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        CoreError::Validation(format!("session_date must be YYYY-MM-DD, got '{date}'"))
    })?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| CoreError::Validation(format!("start must be HH:MM, got '{time}'")))?;

    Ok(date.and_time(time).and_utc())
}

/// Resolve a session end timestamp.
///
/// An explicit RFC 3339 `end_time` is used when present; otherwise the end is
/// `start + default_minutes`. The end must be strictly after the start.
pub fn resolve_end_time(
    start: Timestamp,
    end_time: Option<&str>,
    default_minutes: i32,
) -> Result<Timestamp, CoreError> {
    let end = match end_time.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_rfc3339(raw, "end_time")?,
        None => start + Duration::minutes(i64::from(default_minutes)),
    };
    if end <= start {
        return Err(CoreError::Validation(
            "end_time must be after the start time".to_string(),
        ));
    }
    Ok(end)
}

fn parse_rfc3339(raw: &str, field: &str) -> Result<Timestamp, CoreError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CoreError::Validation(format!("{field} must be an RFC 3339 timestamp")))
}

/// Require a non-blank text field, returning it trimmed.
pub fn require_text(value: &str, field: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
