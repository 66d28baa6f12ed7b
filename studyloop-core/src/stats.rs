use crate::{CardId, Difficulty, ReviewEvent, ReviewGrade};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Totals {
    pub total: u32,
    pub easy: u32,
    pub confusing: u32,
    pub hard: u32,
    pub passed: u32,
}

impl Totals {
    pub fn record(&mut self, g: ReviewGrade) {
        self.total += 1;
        if g.score().is_pass() {
            self.passed += 1;
        }
        if let ReviewGrade::Label(d) = g {
            match d {
                Difficulty::Easy => self.easy += 1,
                Difficulty::Confusing => self.confusing += 1,
                Difficulty::Hard => self.hard += 1,
            }
        }
    }

    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f32 / self.total as f32
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionSummary {
    pub totals: Totals,
    pub per_card: BTreeMap<CardId, Totals>,
}

pub fn summarize(reviews: &[ReviewEvent]) -> SessionSummary {
    let mut summary = SessionSummary::default();
    for r in reviews {
        summary.totals.record(r.grade);
        summary.per_card.entry(r.card_id).or_default().record(r.grade);
    }
    summary
}
