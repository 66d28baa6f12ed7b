use crate::{CardId, CoreError, DeckId, SessionJournal, StudySession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardDifficultyResult {
    pub card_id: CardId,
    pub difficulty: String,
    pub timestamp: DateTime<Utc>,
}

/// One batch of reviews for the backend. Reviews keep journal order and are
/// never deduplicated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub deck_id: DeckId,
    pub card_difficulty_results: Vec<CardDifficultyResult>,
    pub idempotency_key: String,
}

impl BatchRequest {
    pub fn from_session(session: &StudySession) -> Self {
        let card_difficulty_results = session
            .reviews
            .iter()
            .map(|r| CardDifficultyResult {
                card_id: r.card_id,
                difficulty: r.grade.as_wire(),
                timestamp: r.timestamp,
            })
            .collect::<Vec<_>>();
        Self {
            deck_id: session.deck_id.clone(),
            idempotency_key: format!("{}-{}", session.session_id, card_difficulty_results.len()),
            card_difficulty_results,
        }
    }

    pub fn len(&self) -> usize {
        self.card_difficulty_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.card_difficulty_results.is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("timed out")]
    Timeout,
}

/// Network side of a submission. Must resolve only once the backend has
/// definitively accepted or rejected the batch.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, batch: &BatchRequest) -> Result<(), SubmitError>;
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub deck_id: DeckId,
    pub submitted: usize,
}

pub struct SubmissionCoordinator {
    journal: Arc<SessionJournal>,
    submitter: Arc<dyn Submitter>,
    in_flight: Mutex<bool>,
}

struct InFlight<'a>(&'a Mutex<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0.lock() = false;
    }
}

impl SubmissionCoordinator {
    pub fn new(journal: Arc<SessionJournal>, submitter: Arc<dyn Submitter>) -> Self {
        Self {
            journal,
            submitter,
            in_flight: Mutex::new(false),
        }
    }

    pub fn journal(&self) -> &Arc<SessionJournal> {
        &self.journal
    }

    fn begin(&self) -> Result<InFlight<'_>, CoreError> {
        let mut busy = self.in_flight.lock();
        if *busy {
            return Err(CoreError::SubmissionInFlight);
        }
        *busy = true;
        Ok(InFlight(&self.in_flight))
    }

    /// Submit the journaled session for `deck_id` as one batch.
    ///
    /// The journal is only touched after the submitter reports success. On any
    /// failure it is left exactly as it was and the error is returned; retrying
    /// is up to the caller.
    pub async fn submit_session(&self, deck_id: &str) -> Result<SubmissionResult, CoreError> {
        let _guard = self.begin()?;

        let session = self
            .journal
            .get_session(deck_id)
            .filter(|s| !s.reviews.is_empty())
            .ok_or_else(|| CoreError::NoSession(deck_id.to_string()))?;

        let batch = BatchRequest::from_session(&session);
        info!(deck_id, reviews = batch.len(), key = %batch.idempotency_key, "submitting study session");

        if let Err(e) = self.submitter.submit(&batch).await {
            warn!(deck_id, error = %e, "submission failed; journal kept for retry");
            return Err(CoreError::SubmissionFailed(e));
        }

        if let Err(e) = self.journal.acknowledge(session.session_id, batch.len()) {
            // Accepted server-side; a resubmit carries the same idempotency key.
            warn!(deck_id, error = %e, "submitted but failed to clear journal");
        }

        Ok(SubmissionResult {
            deck_id: deck_id.to_string(),
            submitted: batch.len(),
        })
    }

    /// Run [`Self::submit_session`] on a background task so it completes even
    /// if the caller stops waiting. Must be called within a Tokio runtime.
    pub fn spawn_submit(
        self: &Arc<Self>,
        deck_id: impl Into<DeckId>,
    ) -> JoinHandle<Result<SubmissionResult, CoreError>> {
        let this = Arc::clone(self);
        let deck_id = deck_id.into();
        tokio::spawn(async move { this.submit_session(&deck_id).await })
    }
}
