//! Therapist availability windows and bookable slot computation.
//!
//! Windows are weekly and expressed in minutes after UTC midnight. Slots are
//! produced by cutting each window occurrence into fixed-length sessions and
//! dropping any that overlap a busy interval (existing bookings or calendar
//! events).

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum span a single slot query may cover.
pub const MAX_SLOT_RANGE_DAYS: i64 = 31;

/// Minutes in a day; the exclusive upper bound for window minutes.
pub const MINUTES_PER_DAY: i32 = 1440;

/// A recurring weekly availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyWindow {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: i16,
    pub start_minute: i32,
    pub end_minute: i32,
}

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Interval {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Validate a full replacement set of weekly windows.
///
/// Each window must have a weekday in `0..=6` and `0 <= start < end <= 1440`,
/// and windows on the same weekday must not overlap.
pub fn validate_windows(windows: &[WeeklyWindow]) -> Result<(), CoreError> {
    for w in windows {
        if !(0..=6).contains(&w.weekday) {
            return Err(CoreError::Validation(format!(
                "weekday must be between 0 and 6, got {}",
                w.weekday
            )));
        }
        if w.start_minute < 0 || w.end_minute > MINUTES_PER_DAY || w.start_minute >= w.end_minute {
            return Err(CoreError::Validation(format!(
                "invalid window {}..{}: expected 0 <= start < end <= {MINUTES_PER_DAY}",
                w.start_minute, w.end_minute
            )));
        }
    }

    let mut sorted = windows.to_vec();
    sorted.sort_by_key(|w| (w.weekday, w.start_minute));
    for pair in sorted.windows(2) {
        if pair[0].weekday == pair[1].weekday && pair[1].start_minute < pair[0].end_minute {
            return Err(CoreError::Validation(format!(
                "availability windows overlap on weekday {}",
                pair[0].weekday
            )));
        }
    }
    Ok(())
}

/// Validate a slot query range.
pub fn validate_range(from: Timestamp, to: Timestamp) -> Result<(), CoreError> {
    if to <= from {
        return Err(CoreError::Validation(
            "'to' must be after 'from'".to_string(),
        ));
    }
    if to - from > Duration::days(MAX_SLOT_RANGE_DAYS) {
        return Err(CoreError::Validation(format!(
            "slot range may not exceed {MAX_SLOT_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Compute bookable slots in `[from, to)`.
///
/// Slots starting before `now` are dropped. The result is sorted by start
/// time and contains no duplicates.
pub fn compute_slots(
    windows: &[WeeklyWindow],
    from: Timestamp,
    to: Timestamp,
    slot_minutes: i32,
    busy: &[Interval],
    now: Timestamp,
) -> Vec<Interval> {
    if slot_minutes <= 0 || to <= from {
        return Vec::new();
    }
    let slot_len = Duration::minutes(i64::from(slot_minutes));

    let mut slots = Vec::new();
    let mut day: NaiveDate = from.date_naive();
    let last_day = to.date_naive();

    while day <= last_day {
        let weekday = day.weekday().num_days_from_monday() as i16;
        let midnight = day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());

        if let Some(midnight) = midnight {
            for w in windows.iter().filter(|w| w.weekday == weekday) {
                let window_end = midnight + Duration::minutes(i64::from(w.end_minute));
                let mut start = midnight + Duration::minutes(i64::from(w.start_minute));

                while start + slot_len <= window_end {
                    let slot = Interval::new(start, start + slot_len);
                    if slot.start >= from
                        && slot.end <= to
                        && slot.start >= now
                        && !busy.iter().any(|b| b.overlaps(&slot))
                    {
                        slots.push(slot);
                    }
                    start += slot_len;
                }
            }
        }

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    slots.sort_by_key(|s| s.start);
    slots.dedup();
    slots
}
