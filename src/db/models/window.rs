use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, Time};
use validator::Validate;

/// Wire format for times of day ("09:30") and calendar dates ("2026-03-02").
pub const TIME_FMT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
pub const DATE_FMT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A recurring weekly availability interval. Exactly one of `owner_user_id`
/// and `request_id` is set: owner windows are keyed by owner, guest windows
/// by the request they were submitted for.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WeeklyWindow {
    pub id: Uuid,
    pub owner_user_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub day_of_week: i16,
    pub start_time: Time,
    pub end_time: Time,
    /// Declaration order within one submission; overlap takes the first
    /// window per day by this order.
    pub position: i16,
    pub created_at: OffsetDateTime,
}

/// Parsed and range-checked window, ready for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    pub day_of_week: i16,
    pub start_time: Time,
    pub end_time: Time,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WindowInput {
    #[validate(range(min = 1, max = 7, message = "Day of week must be between 1 (Monday) and 7 (Sunday)"))]
    pub day_of_week: i16,
    pub start_time: String,
    pub end_time: String,
}

impl WindowInput {
    /// Parse the HH:MM strings and check the interval is non-empty.
    pub fn to_span(&self) -> Result<WindowSpan, String> {
        let start_time = Time::parse(&self.start_time, TIME_FMT)
            .map_err(|_| format!("Invalid start time: {}", self.start_time))?;
        let end_time = Time::parse(&self.end_time, TIME_FMT)
            .map_err(|_| format!("Invalid end time: {}", self.end_time))?;
        if start_time >= end_time {
            return Err(format!(
                "Window must start before it ends: {} >= {}",
                self.start_time, self.end_time
            ));
        }
        Ok(WindowSpan {
            day_of_week: self.day_of_week,
            start_time,
            end_time,
        })
    }
}
