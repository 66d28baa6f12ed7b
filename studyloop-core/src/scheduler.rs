//! SM-2 scheduling.
//!
//! A failed recall (grade < 3) resets the repetition count and brings the card
//! back the next day. Successful recalls step through 1 day, 6 days, then grow
//! the previous interval by the ease factor. The ease factor moves on every
//! review and never drops below [`EF_MIN`]. Intervals are capped at
//! [`MAX_INTERVAL_DAYS`].

use crate::{CardSchedule, CoreError, Grade, ReviewGrade, EF_MIN, MAX_INTERVAL_DAYS};
use chrono::{DateTime, Duration, Utc};

fn clamp_ef(x: f64) -> f64 {
    x.max(EF_MIN)
}

fn ease_delta(grade: Grade) -> f64 {
    let miss = (5 - grade.value()) as f64;
    0.1 - miss * (0.08 + miss * 0.02)
}

/// Advance `schedule` by one review graded `grade` (0..=5), due dates relative to now.
pub fn advance(schedule: &CardSchedule, grade: u8) -> Result<CardSchedule, CoreError> {
    advance_at(schedule, grade, Utc::now())
}

pub fn advance_at(
    schedule: &CardSchedule,
    grade: u8,
    now: DateTime<Utc>,
) -> Result<CardSchedule, CoreError> {
    let grade = Grade::new(grade as i64)?;
    Ok(step(schedule, grade, now))
}

/// Same as [`advance_at`] for a grade recorded by the UI, labels normalized first.
pub fn advance_with(schedule: &CardSchedule, grade: ReviewGrade, now: DateTime<Utc>) -> CardSchedule {
    step(schedule, grade.score(), now)
}

fn step(schedule: &CardSchedule, grade: Grade, now: DateTime<Utc>) -> CardSchedule {
    let (repetitions, interval_days) = if !grade.is_pass() {
        (0, 1)
    } else {
        let reps = schedule.repetitions.saturating_add(1);
        let interval = match reps {
            1 => 1,
            2 => 6,
            // uses the ease factor from before this review
            _ => {
                let base = schedule.interval_days.max(1) as f64;
                (base * schedule.ease_factor).round().max(1.0) as u32
            }
        };
        (reps, interval.min(MAX_INTERVAL_DAYS))
    };

    let ease_factor = clamp_ef(schedule.ease_factor + ease_delta(grade));

    CardSchedule {
        card_id: schedule.card_id,
        repetitions,
        ease_factor,
        interval_days,
        next_review_date: now + Duration::days(interval_days as i64),
    }
}
