//! Durable, append-only record of the reviews in the active study session.
//!
//! The whole session lives under a single key of the injected [`KvStore`].
//! Only one session exists at a time: a review for another deck starts a
//! fresh session and the previous one is discarded.

use crate::{CoreError, DeckId, KvStore, ReviewEvent, SessionId, StoreError, StudySession};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const JOURNAL_KEY: &str = "study_session";
pub const ACTIVE_SESSION_SLOTS: usize = 1;
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq)]
pub enum AppendOutcome {
    /// The review is durably stored and is the last entry of the session.
    Recorded {
        started_new: bool,
        replaced_deck: Option<DeckId>,
        len: usize,
    },
    /// The review was not kept: either the stored session could not be read,
    /// or both the write and the post-prune retry failed.
    Dropped { reason: StoreError },
}

impl AppendOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AppendOutcome::Recorded { .. })
    }
}

enum Slot {
    Empty,
    Session(StudySession),
    Corrupt,
    /// The store failed to answer; whatever it holds must not be overwritten.
    Unreadable(StoreError),
}

pub struct SessionJournal {
    store: Arc<dyn KvStore>,
    key: String,
}

impl SessionJournal {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_key(store, JOURNAL_KEY)
    }

    pub fn with_key(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn slot(&self) -> Slot {
        match self.store.read(&self.key) {
            Ok(None) => Slot::Empty,
            Ok(Some(raw)) => match serde_json::from_str::<StudySession>(&raw) {
                Ok(s) => Slot::Session(s),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "unreadable study session in storage");
                    Slot::Corrupt
                }
            },
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read study session");
                Slot::Unreadable(e)
            }
        }
    }

    fn load(&self) -> Option<StudySession> {
        match self.slot() {
            Slot::Session(s) => Some(s),
            Slot::Empty | Slot::Corrupt | Slot::Unreadable(_) => None,
        }
    }

    fn save(&self, session: &StudySession) -> Result<(), StoreError> {
        let raw = serde_json::to_string(session).map_err(|e| StoreError::Io(e.to_string()))?;
        self.store.write(&self.key, &raw)
    }

    pub fn append_review(
        &self,
        deck_id: &str,
        event: ReviewEvent,
    ) -> Result<AppendOutcome, CoreError> {
        self.append_review_at(deck_id, event, Utc::now())
    }

    /// Append `event` to the session for `deck_id`, starting a new session if
    /// none exists or the stored one belongs to another deck.
    ///
    /// Storage failures never surface as errors: after a failed write, stale
    /// sessions are pruned and the write is retried once, and if that fails too
    /// the review is dropped with [`AppendOutcome::Dropped`]. A failed read also
    /// drops the review, leaving the stored session untouched. The only error is
    /// [`CoreError::JournalInconsistent`], returned when a write reported success
    /// but the review cannot be read back.
    pub fn append_review_at(
        &self,
        deck_id: &str,
        event: ReviewEvent,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, CoreError> {
        let current = match self.slot() {
            Slot::Session(s) => Some(s),
            Slot::Empty | Slot::Corrupt => None,
            Slot::Unreadable(reason) => {
                warn!(
                    deck_id,
                    card_id = event.card_id,
                    error = %reason,
                    "review dropped; stored session could not be read"
                );
                return Ok(AppendOutcome::Dropped { reason });
            }
        };
        let (session, started_new, replaced_deck) = match current {
            Some(mut s) if s.is_for(deck_id) => {
                s.push(event.clone(), now);
                (s, false, None)
            }
            Some(previous) => {
                info!(
                    from = %previous.deck_id,
                    to = %deck_id,
                    discarded = previous.reviews.len(),
                    "replacing study session for another deck"
                );
                let s = StudySession::start(deck_id, event.clone(), now);
                (s, true, Some(previous.deck_id))
            }
            None => (StudySession::start(deck_id, event.clone(), now), true, None),
        };

        if let Err(first) = self.save(&session) {
            warn!(error = %first, "journal write failed; pruning stale sessions and retrying");
            self.prune_stale_at(DEFAULT_MAX_AGE_DAYS, now);
            if let Err(second) = self.save(&session) {
                warn!(
                    deck_id,
                    card_id = event.card_id,
                    error = %second,
                    "review dropped from journal"
                );
                return Ok(AppendOutcome::Dropped { reason: second });
            }
        }

        let len = session.reviews.len();
        match self.load() {
            Some(stored)
                if stored.session_id == session.session_id
                    && stored.reviews.len() == len
                    && stored.reviews.last() == Some(&event) =>
            {
                debug!(deck_id, card_id = event.card_id, len, "review journaled");
                Ok(AppendOutcome::Recorded {
                    started_new,
                    replaced_deck,
                    len,
                })
            }
            _ => Err(CoreError::JournalInconsistent(
                "appended review missing on read-back",
            )),
        }
    }

    /// The stored session, only if it belongs to `deck_id`.
    pub fn get_session(&self, deck_id: &str) -> Option<StudySession> {
        self.load().filter(|s| s.is_for(deck_id))
    }

    /// The stored session regardless of deck.
    pub fn peek(&self) -> Option<StudySession> {
        self.load()
    }

    pub fn clear_session(&self) -> Result<(), CoreError> {
        self.store.delete(&self.key).map_err(|e| {
            warn!(key = %self.key, error = %e, "failed to clear study session");
            CoreError::Storage(e)
        })
    }

    pub fn abandon(&self) -> Result<(), CoreError> {
        if let Some(s) = self.load() {
            info!(deck_id = %s.deck_id, discarded = s.reviews.len(), "study session abandoned");
        }
        self.clear_session()
    }

    pub fn prune_stale(&self, max_age_days: i64) -> bool {
        self.prune_stale_at(max_age_days, Utc::now())
    }

    /// Delete the stored session if it started more than `max_age_days` before
    /// `now`. Corrupt data is deleted as well; a failed read deletes nothing.
    /// Returns whether anything was removed.
    pub fn prune_stale_at(&self, max_age_days: i64, now: DateTime<Utc>) -> bool {
        let stale = match self.slot() {
            Slot::Empty | Slot::Unreadable(_) => false,
            Slot::Corrupt => true,
            Slot::Session(s) => s.start_time < now - Duration::days(max_age_days),
        };
        if !stale {
            return false;
        }
        match self.store.delete(&self.key) {
            Ok(()) => {
                info!(key = %self.key, max_age_days, "pruned stale study session");
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to prune stale study session");
                false
            }
        }
    }

    /// Drop the first `submitted` reviews of session `session_id` after the
    /// backend confirmed them.
    ///
    /// Clears the session when nothing else was appended. Reviews appended while
    /// the submission was in flight stay journaled under a fresh session id so
    /// their batch never reuses an acknowledged idempotency key. A session that
    /// was replaced in the meantime is left alone.
    pub fn acknowledge(&self, session_id: SessionId, submitted: usize) -> Result<(), CoreError> {
        let Some(mut s) = self.load() else {
            return Ok(());
        };
        if s.session_id != session_id {
            debug!(deck_id = %s.deck_id, "session replaced during submission; leaving it");
            return Ok(());
        }
        if s.reviews.len() <= submitted {
            return self.clear_session();
        }
        s.reviews = s.reviews.split_off(submitted);
        s.session_id = Uuid::new_v4();
        info!(deck_id = %s.deck_id, remaining = s.reviews.len(), "kept reviews appended during submission");
        self.save(&s).map_err(CoreError::Storage)
    }
}
