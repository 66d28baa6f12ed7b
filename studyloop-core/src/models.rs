use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

pub type DeckId = String;
pub type CardId = i64;
pub type SessionId = Uuid;

pub const EF_MIN: f64 = 1.3;
pub const EF_DEFAULT: f64 = 2.5;
/// Longest interval the scheduler hands out, about a hundred years.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;
pub const GRADE_MAX: u8 = 5;
pub const PASSING_GRADE: u8 = 3;

/// Recall quality on the 0..=5 scale. 0 is a total blackout, 5 is perfect recall.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "i64", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub fn new(value: i64) -> Result<Self, CoreError> {
        if (0..=GRADE_MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(CoreError::InvalidGrade(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_GRADE
    }
}

impl TryFrom<i64> for Grade {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(g: Grade) -> Self {
        g.0
    }
}

/// The three difficulty buttons shown after a card is flipped.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Confusing,
    Hard,
}

impl Difficulty {
    /// Fixed label-to-score table: hard=2 (a lapse), confusing=3 (barely passed), easy=5.
    pub fn as_grade(self) -> Grade {
        match self {
            Difficulty::Hard => Grade(2),
            Difficulty::Confusing => Grade(3),
            Difficulty::Easy => Grade(5),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Confusing => "confusing",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "confusing" => Ok(Difficulty::Confusing),
            "hard" => Ok(Difficulty::Hard),
            other => Err(CoreError::InvalidLabel(other.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grade as recorded by the UI: either a coarse label or a numeric score.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReviewGrade {
    Label(Difficulty),
    Score(Grade),
}

impl ReviewGrade {
    pub fn score(self) -> Grade {
        match self {
            ReviewGrade::Label(d) => d.as_grade(),
            ReviewGrade::Score(g) => g,
        }
    }

    /// The `difficulty` string sent to the backend.
    pub fn as_wire(self) -> String {
        match self {
            ReviewGrade::Label(d) => d.as_str().to_string(),
            ReviewGrade::Score(g) => g.value().to_string(),
        }
    }
}

impl From<Difficulty> for ReviewGrade {
    fn from(d: Difficulty) -> Self {
        ReviewGrade::Label(d)
    }
}

impl From<Grade> for ReviewGrade {
    fn from(g: Grade) -> Self {
        ReviewGrade::Score(g)
    }
}

impl FromStr for ReviewGrade {
    type Err = CoreError;

    /// Accepts "0".."5" or one of the difficulty labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(n) => Grade::new(n).map(ReviewGrade::Score),
            Err(_) => s.parse::<Difficulty>().map(ReviewGrade::Label),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    New,
    DueToday,
    Lapsed,
    Future,
}

/// Per-card memory state. Only [`crate::scheduler::advance`] produces new values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSchedule {
    pub card_id: CardId,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub next_review_date: DateTime<Utc>,
}

impl CardSchedule {
    pub fn new(card_id: CardId) -> Self {
        Self::new_at(card_id, Utc::now())
    }

    pub fn new_at(card_id: CardId, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            repetitions: 0,
            ease_factor: EF_DEFAULT,
            interval_days: 1,
            next_review_date: now,
        }
    }

    pub fn is_new(&self) -> bool {
        self.repetitions == 0
    }

    pub fn due_status(&self, now: DateTime<Utc>) -> DueStatus {
        if self.is_new() {
            DueStatus::New
        } else if self.next_review_date > now {
            DueStatus::Future
        } else {
            let elapsed = now - self.next_review_date;
            if elapsed.num_hours() >= 24 {
                DueStatus::Lapsed
            } else {
                DueStatus::DueToday
            }
        }
    }
}

/// One grading action. Never mutated once recorded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub card_id: CardId,
    pub grade: ReviewGrade,
    pub timestamp: DateTime<Utc>,
}

impl ReviewEvent {
    pub fn new(card_id: CardId, grade: impl Into<ReviewGrade>) -> Self {
        Self::at(card_id, grade, Utc::now())
    }

    pub fn at(card_id: CardId, grade: impl Into<ReviewGrade>, timestamp: DateTime<Utc>) -> Self {
        Self {
            card_id,
            grade: grade.into(),
            timestamp,
        }
    }
}

/// The journal's persisted unit, scoped to exactly one deck.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub session_id: SessionId,
    pub deck_id: DeckId,
    pub reviews: Vec<ReviewEvent>,
    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl StudySession {
    pub fn start(deck_id: impl Into<DeckId>, first: ReviewEvent, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            deck_id: deck_id.into(),
            reviews: vec![first],
            start_time: now,
            last_update: now,
        }
    }

    pub fn push(&mut self, event: ReviewEvent, now: DateTime<Utc>) {
        self.reviews.push(event);
        self.last_update = now;
    }

    pub fn is_for(&self, deck_id: &str) -> bool {
        self.deck_id == deck_id
    }
}
