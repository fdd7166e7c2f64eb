//! Weekly therapist availability rows.

use ledgerwell_core::availability::WeeklyWindow;
use ledgerwell_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `therapist_availability` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailabilityWindow {
    pub id: DbId,
    pub therapist_id: DbId,
    pub weekday: i16,
    pub start_minute: i32,
    pub end_minute: i32,
    pub created_at: Timestamp,
}

impl From<&AvailabilityWindow> for WeeklyWindow {
    fn from(row: &AvailabilityWindow) -> Self {
        WeeklyWindow {
            weekday: row.weekday,
            start_minute: row.start_minute,
            end_minute: row.end_minute,
        }
    }
}
