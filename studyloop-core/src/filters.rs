use crate::{CardSchedule, DueStatus};
use chrono::{DateTime, Utc};

pub fn filter_due(schedules: &[CardSchedule], now: DateTime<Utc>, want: DueStatus) -> Vec<CardSchedule> {
    schedules
        .iter()
        .filter(|s| s.due_status(now) == want)
        .cloned()
        .collect()
}

/// Everything that should be practiced now: new, due today and lapsed cards,
/// earliest review date first.
pub fn due_now(schedules: &[CardSchedule], now: DateTime<Utc>) -> Vec<CardSchedule> {
    let mut v: Vec<CardSchedule> = schedules
        .iter()
        .filter(|s| s.due_status(now) != DueStatus::Future)
        .cloned()
        .collect();
    v.sort_by_key(|s| (s.next_review_date, s.card_id));
    v
}
