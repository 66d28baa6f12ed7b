use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studyloop_core::{AppendOutcome, CardId, CardSchedule, DeckId, ReviewGrade};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewIn {
    pub card_id: CardId,
    /// 0-5 or "easy" / "confusing" / "hard"
    pub grade: ReviewGrade,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct ReviewOut {
    pub recorded: bool,
    pub len: usize,
    pub started_new: bool,
    pub replaced_deck: Option<DeckId>,
    pub warning: Option<String>,
}

impl From<AppendOutcome> for ReviewOut {
    fn from(o: AppendOutcome) -> Self {
        match o {
            AppendOutcome::Recorded { started_new, replaced_deck, len } => Self {
                recorded: true,
                len,
                started_new,
                replaced_deck,
                warning: None,
            },
            AppendOutcome::Dropped { reason } => Self {
                recorded: false,
                len: 0,
                started_new: false,
                replaced_deck: None,
                warning: Some(format!("review not saved: {reason}")),
            },
        }
    }
}

#[derive(Deserialize)]
pub struct AdvanceIn {
    pub schedule: CardSchedule,
    pub grade: ReviewGrade,
}
