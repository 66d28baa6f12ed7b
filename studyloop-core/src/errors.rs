use crate::submit::SubmitError;
use crate::DeckId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid grade: {0} (expected 0..=5)")]
    InvalidGrade(i64),
    #[error("invalid difficulty label: {0}")]
    InvalidLabel(String),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("journal inconsistent: {0}")]
    JournalInconsistent(&'static str),
    #[error("no study session for deck {0}")]
    NoSession(DeckId),
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] SubmitError),
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage quota exceeded: needed {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },
    #[error("io: {0}")]
    Io(String),
}
