//! Pure overlap engine: intersects the owner's and the guest's weekly windows
//! and turns the intersection into concrete, hour-long bookable slots.
//!
//! The result is a function of current stored state only. It is recomputed on
//! every call and never cached, since either party's windows may change until
//! the request reaches a terminal state.

use time::{Date, Duration, Time};

use crate::db::models::WeeklyWindow;

/// Fixed slot length in minutes.
pub const SLOT_MINUTES: i32 = 60;

/// Weekday names indexed by day-of-week 1..=7 (1 = Monday).
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn day_name(day_of_week: i16) -> &'static str {
    DAY_NAMES[(day_of_week as usize).clamp(1, 7) - 1]
}

/// A concrete bookable slot. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapSlot {
    pub day_of_week: i16,
    pub date: Date,
    pub start: Time,
    pub end: Time,
    pub display: String,
}

impl OverlapSlot {
    fn new(day_of_week: i16, date: Date, start_minutes: i32) -> Self {
        let start = time_from_minutes(start_minutes);
        let end = time_from_minutes(start_minutes + SLOT_MINUTES);
        OverlapSlot {
            day_of_week,
            date,
            start,
            end,
            display: format!("{} {}", day_name(day_of_week), twelve_hour(start)),
        }
    }
}

/// Compute the bookable slots for one request, given both parties' full weekly
/// window sets and today's date.
///
/// Per weekday 1..=7 independently: take the first window each party declared
/// for that day (multi-window merging is deliberately out of scope), intersect
/// the two intervals, and emit consecutive 60-minute slots that fit entirely
/// inside the intersection. Each slot is dated with the next occurrence of its
/// weekday strictly after `today`. Output is ordered by weekday ascending,
/// then start time ascending.
pub fn compute_overlap(
    owner_windows: &[WeeklyWindow],
    guest_windows: &[WeeklyWindow],
    today: Date,
) -> Vec<OverlapSlot> {
    let mut slots = Vec::new();

    for day in 1..=7i16 {
        let Some(owner) = owner_windows.iter().find(|w| w.day_of_week == day) else {
            continue;
        };
        let Some(guest) = guest_windows.iter().find(|w| w.day_of_week == day) else {
            continue;
        };

        let overlap_start = minutes_of(owner.start_time).max(minutes_of(guest.start_time));
        let overlap_end = minutes_of(owner.end_time).min(minutes_of(guest.end_time));
        if overlap_start >= overlap_end {
            continue;
        }

        let date = next_occurrence(today, day);
        let mut cursor = overlap_start;
        while cursor + SLOT_MINUTES <= overlap_end {
            slots.push(OverlapSlot::new(day, date, cursor));
            cursor += SLOT_MINUTES;
        }
    }

    slots
}

/// Next calendar date after `today` falling on the given weekday. A weekday
/// matching today rolls forward a full week: generated slots are always for a
/// future occurrence, never today.
fn next_occurrence(today: Date, day_of_week: i16) -> Date {
    let today_dow = today.weekday().number_from_monday() as i16;
    let mut delta = (day_of_week - today_dow).rem_euclid(7);
    if delta == 0 {
        delta = 7;
    }
    today.saturating_add(Duration::days(delta as i64))
}

fn minutes_of(t: Time) -> i32 {
    t.hour() as i32 * 60 + t.minute() as i32
}

fn time_from_minutes(minutes: i32) -> Time {
    // Callers only pass minute counts inside a single day.
    Time::from_hms((minutes / 60) as u8, (minutes % 60) as u8, 0).unwrap_or(Time::MIDNIGHT)
}

fn twelve_hour(t: Time) -> String {
    let (hour, meridiem) = match t.hour() {
        0 => (12, "AM"),
        h @ 1..=11 => (h, "AM"),
        12 => (12, "PM"),
        h => (h - 12, "PM"),
    };
    format!("{}:{:02} {}", hour, t.minute(), meridiem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};
    use uuid::Uuid;

    fn window(day_of_week: i16, start_time: Time, end_time: Time) -> WeeklyWindow {
        WeeklyWindow {
            id: Uuid::new_v4(),
            owner_user_id: None,
            request_id: None,
            day_of_week,
            start_time,
            end_time,
            position: 0,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    // 2026-08-26 is a Wednesday.
    const TODAY: Date = date!(2026 - 08 - 26);

    #[test]
    fn partial_hour_at_the_tail_is_dropped() {
        // Mon 09:00-11:00 x Mon 10:00-12:00 -> exactly one slot, 10:00-11:00.
        let owner = vec![window(1, time!(09:00), time!(11:00))];
        let guest = vec![window(1, time!(10:00), time!(12:00))];

        let slots = compute_overlap(&owner, &guest, TODAY);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].day_of_week, 1);
        assert_eq!(slots[0].start, time!(10:00));
        assert_eq!(slots[0].end, time!(11:00));
        assert_eq!(slots[0].display, "Monday 10:00 AM");
    }

    #[test]
    fn day_without_both_parties_yields_no_slots() {
        let owner = vec![
            window(1, time!(09:00), time!(17:00)),
            window(2, time!(09:00), time!(17:00)),
        ];
        let guest = vec![window(2, time!(09:00), time!(17:00))];

        let slots = compute_overlap(&owner, &guest, TODAY);
        assert!(!slots.is_empty());
        assert!(slots.iter().all(|s| s.day_of_week == 2));
    }

    #[test]
    fn slot_count_is_floor_of_overlap_over_sixty() {
        // Overlap 09:30-12:00 = 150 minutes -> 2 slots.
        let owner = vec![window(4, time!(08:00), time!(12:00))];
        let guest = vec![window(4, time!(09:30), time!(18:00))];

        let slots = compute_overlap(&owner, &guest, TODAY);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, time!(09:30));
        assert_eq!(slots[1].start, time!(10:30));
    }

    #[test]
    fn touching_intervals_produce_nothing() {
        let owner = vec![window(3, time!(09:00), time!(10:00))];
        let guest = vec![window(3, time!(10:00), time!(11:00))];

        assert!(compute_overlap(&owner, &guest, TODAY).is_empty());
    }

    #[test]
    fn only_first_window_per_day_is_considered() {
        let owner = vec![
            window(5, time!(09:00), time!(10:00)),
            window(5, time!(14:00), time!(18:00)),
        ];
        let guest = vec![window(5, time!(14:00), time!(16:00))];

        // Owner's second Friday window is ignored, so no intersection exists.
        assert!(compute_overlap(&owner, &guest, TODAY).is_empty());
    }

    #[test]
    fn dates_land_on_the_next_future_occurrence() {
        let owner = vec![
            window(3, time!(09:00), time!(10:00)),
            window(4, time!(09:00), time!(10:00)),
        ];
        let guest = owner.clone();

        let slots = compute_overlap(&owner, &guest, TODAY);
        assert_eq!(slots.len(), 2);
        // Today is Wednesday: Wednesday rolls a full week forward, Thursday is tomorrow.
        assert_eq!(slots[0].date, date!(2026 - 09 - 02));
        assert_eq!(slots[1].date, date!(2026 - 08 - 27));
    }

    #[test]
    fn ordered_by_weekday_then_time() {
        let owner = vec![
            window(6, time!(09:00), time!(11:00)),
            window(2, time!(09:00), time!(11:00)),
        ];
        let guest = vec![
            window(2, time!(09:00), time!(11:00)),
            window(6, time!(09:00), time!(11:00)),
        ];

        let slots = compute_overlap(&owner, &guest, TODAY);
        let order: Vec<(i16, Time)> = slots.iter().map(|s| (s.day_of_week, s.start)).collect();
        assert_eq!(
            order,
            vec![
                (2, time!(09:00)),
                (2, time!(10:00)),
                (6, time!(09:00)),
                (6, time!(10:00)),
            ]
        );
    }

    #[test]
    fn midnight_spanning_end_is_treated_as_empty() {
        // end 00:00 reads as minute zero, so the interval is empty rather than
        // wrapping past midnight.
        let owner = vec![window(1, time!(22:00), time!(00:00))];
        let guest = vec![window(1, time!(21:00), time!(23:59))];

        assert!(compute_overlap(&owner, &guest, TODAY).is_empty());
    }
}
