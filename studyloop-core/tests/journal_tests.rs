use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use studyloop_core::{
    AppendOutcome, CoreError, Difficulty, Grade, KvStore, MemoryStore, ReviewEvent,
    SessionJournal, StoreError, StudySession, JOURNAL_KEY,
};

fn event(card: i64, d: Difficulty) -> ReviewEvent {
    ReviewEvent::new(card, d)
}

fn journal() -> (Arc<MemoryStore>, SessionJournal) {
    let store = Arc::new(MemoryStore::new());
    let j = SessionJournal::new(store.clone());
    (store, j)
}

/// Fails the next `fail_writes` writes and `fail_reads` reads, and optionally
/// stops reads from seeing what was written.
#[derive(Default)]
struct ScriptedStore {
    inner: MemoryStore,
    fail_writes: Mutex<usize>,
    fail_reads: Mutex<usize>,
    writes_attempted: Mutex<usize>,
    deletes: Mutex<usize>,
    blind_reads: bool,
}

impl ScriptedStore {
    fn failing(n: usize) -> Self {
        Self {
            fail_writes: Mutex::new(n),
            ..Default::default()
        }
    }
}

impl KvStore for ScriptedStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut left = self.fail_reads.lock();
        if *left > 0 {
            *left -= 1;
            return Err(StoreError::Io("EIO".into()));
        }
        drop(left);
        if self.blind_reads {
            return Ok(None);
        }
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        *self.writes_attempted.lock() += 1;
        let mut left = self.fail_writes.lock();
        if *left > 0 {
            *left -= 1;
            return Err(StoreError::QuotaExceeded { needed: value.len(), available: 0 });
        }
        self.inner.write(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        *self.deletes.lock() += 1;
        self.inner.delete(key)
    }
}

fn stale_session(deck: &str, days_old: i64) -> StudySession {
    let then = Utc::now() - Duration::days(days_old);
    StudySession::start(deck, ReviewEvent::at(99, Difficulty::Hard, then), then)
}

#[test]
fn append_then_read_back_in_order() {
    let (_, j) = journal();
    let e1 = event(1, Difficulty::Easy);
    let e2 = event(2, Difficulty::Hard);
    let e3 = ReviewEvent::new(1, Grade::new(4).unwrap());

    let first = j.append_review("deck-a", e1.clone()).unwrap();
    assert_eq!(
        first,
        AppendOutcome::Recorded { started_new: true, replaced_deck: None, len: 1 }
    );
    j.append_review("deck-a", e2.clone()).unwrap();
    let last = j.append_review("deck-a", e3.clone()).unwrap();
    assert_eq!(
        last,
        AppendOutcome::Recorded { started_new: false, replaced_deck: None, len: 3 }
    );

    let s = j.get_session("deck-a").unwrap();
    assert_eq!(s.reviews, vec![e1, e2, e3]);
    assert!(s.last_update >= s.start_time);
}

#[test]
fn same_card_twice_is_kept_twice() {
    let (_, j) = journal();
    j.append_review("d", event(5, Difficulty::Hard)).unwrap();
    j.append_review("d", event(5, Difficulty::Easy)).unwrap();
    let s = j.get_session("d").unwrap();
    assert_eq!(s.reviews.len(), 2);
    assert!(s.reviews.iter().all(|r| r.card_id == 5));
}

#[test]
fn other_deck_replaces_session() {
    let (_, j) = journal();
    let e1 = event(1, Difficulty::Easy);
    let e2 = event(2, Difficulty::Confusing);
    j.append_review("A", e1).unwrap();
    let out = j.append_review("B", e2.clone()).unwrap();
    assert_eq!(
        out,
        AppendOutcome::Recorded { started_new: true, replaced_deck: Some("A".into()), len: 1 }
    );

    assert!(j.get_session("A").is_none());
    assert_eq!(j.get_session("B").unwrap().reviews, vec![e2]);
}

#[test]
fn get_session_for_other_deck_is_none() {
    let (_, j) = journal();
    j.append_review("A", event(1, Difficulty::Easy)).unwrap();
    assert!(j.get_session("B").is_none());
    assert_eq!(j.peek().unwrap().deck_id, "A");
}

#[test]
fn survives_a_new_journal_over_the_same_store() {
    let (store, j) = journal();
    let e = event(3, Difficulty::Confusing);
    j.append_review("deck", e.clone()).unwrap();
    drop(j);

    let reopened = SessionJournal::new(store);
    assert_eq!(reopened.get_session("deck").unwrap().reviews, vec![e]);
}

#[test]
fn persists_camel_case_json_under_fixed_key() {
    let (store, j) = journal();
    j.append_review("deck-9", event(3, Difficulty::Easy)).unwrap();
    let raw = store.read(JOURNAL_KEY).unwrap().unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["deckId"], "deck-9");
    assert_eq!(v["reviews"][0]["cardId"], 3);
    assert_eq!(v["reviews"][0]["grade"], "easy");
    assert!(v["startTime"].is_string());
    assert!(v["lastUpdate"].is_string());
}

#[test]
fn clear_and_abandon_remove_session() {
    let (store, j) = journal();
    j.append_review("d", event(1, Difficulty::Easy)).unwrap();
    j.clear_session().unwrap();
    assert!(j.get_session("d").is_none());
    assert!(store.is_empty());

    j.append_review("d", event(1, Difficulty::Easy)).unwrap();
    j.abandon().unwrap();
    assert!(j.peek().is_none());
    // clearing an empty journal is fine
    j.clear_session().unwrap();
}

#[test]
fn prune_removes_only_old_sessions() {
    let (store, j) = journal();
    j.append_review("fresh", event(1, Difficulty::Easy)).unwrap();
    assert!(!j.prune_stale(7));
    assert!(j.get_session("fresh").is_some());

    let old = stale_session("old", 8);
    store
        .write(JOURNAL_KEY, &serde_json::to_string(&old).unwrap())
        .unwrap();
    assert!(j.prune_stale(7));
    assert!(j.peek().is_none());
    assert!(!j.prune_stale(7));
}

#[test]
fn corrupt_session_reads_as_absent_and_is_pruned() {
    let (store, j) = journal();
    store.write(JOURNAL_KEY, "{not json").unwrap();
    assert!(j.get_session("d").is_none());
    assert!(j.prune_stale(7));
    assert!(store.read(JOURNAL_KEY).unwrap().is_none());

    store.write(JOURNAL_KEY, "{not json").unwrap();
    let out = j.append_review("d", event(1, Difficulty::Easy)).unwrap();
    assert!(out.is_recorded());
}

#[test]
fn failed_write_prunes_and_retries_once() {
    let store = Arc::new(ScriptedStore::failing(1));
    let j = SessionJournal::new(store.clone());
    let e = event(1, Difficulty::Easy);

    let out = j.append_review("d", e.clone()).unwrap();
    assert!(out.is_recorded());
    assert_eq!(*store.writes_attempted.lock(), 2);
    assert_eq!(j.get_session("d").unwrap().reviews, vec![e]);
}

#[test]
fn retry_clears_stale_session_first() {
    let store = Arc::new(ScriptedStore::default());
    store
        .inner
        .write(JOURNAL_KEY, &serde_json::to_string(&stale_session("old", 30)).unwrap())
        .unwrap();
    *store.fail_writes.lock() = 1;
    let j = SessionJournal::new(store.clone());

    let out = j.append_review("new", event(2, Difficulty::Hard)).unwrap();
    assert!(out.is_recorded());
    assert_eq!(*store.deletes.lock(), 1);
    assert_eq!(j.get_session("new").unwrap().reviews.len(), 1);
}

#[test]
fn second_failure_drops_review_without_error() {
    let store = Arc::new(ScriptedStore::failing(2));
    let j = SessionJournal::new(store.clone());

    let out = j.append_review("d", event(1, Difficulty::Easy)).unwrap();
    assert!(matches!(
        out,
        AppendOutcome::Dropped { reason: StoreError::QuotaExceeded { .. } }
    ));
    assert_eq!(*store.writes_attempted.lock(), 2);
    assert!(j.get_session("d").is_none());
}

#[test]
fn quota_exceeded_keeps_existing_reviews() {
    let store = Arc::new(MemoryStore::with_quota(400));
    let j = SessionJournal::new(store.clone());
    let mut recorded = 0;
    let mut dropped = 0;
    for card in 0..20 {
        match j.append_review("d", event(card, Difficulty::Confusing)).unwrap() {
            AppendOutcome::Recorded { .. } => recorded += 1,
            AppendOutcome::Dropped { .. } => dropped += 1,
        }
    }
    assert!(recorded > 0);
    assert!(dropped > 0);
    assert_eq!(j.get_session("d").unwrap().reviews.len(), recorded);
}

#[test]
fn unreadable_write_is_reported() {
    let store = Arc::new(ScriptedStore {
        blind_reads: true,
        ..Default::default()
    });
    let j = SessionJournal::new(store);
    let err = j.append_review("d", event(1, Difficulty::Easy)).unwrap_err();
    assert!(matches!(err, CoreError::JournalInconsistent(_)));
}

#[test]
fn acknowledge_clears_or_keeps_tail() {
    let (_, j) = journal();
    j.append_review("d", event(1, Difficulty::Easy)).unwrap();
    j.append_review("d", event(2, Difficulty::Easy)).unwrap();
    let s = j.get_session("d").unwrap();

    // a review lands while the batch of two is in flight
    let late = event(3, Difficulty::Hard);
    j.append_review("d", late.clone()).unwrap();
    j.acknowledge(s.session_id, 2).unwrap();

    let rest = j.get_session("d").unwrap();
    assert_eq!(rest.reviews, vec![late]);
    assert_ne!(rest.session_id, s.session_id);

    j.acknowledge(rest.session_id, 1).unwrap();
    assert!(j.peek().is_none());
}

#[test]
fn acknowledge_ignores_replaced_session() {
    let (_, j) = journal();
    j.append_review("A", event(1, Difficulty::Easy)).unwrap();
    let a = j.get_session("A").unwrap();
    j.append_review("B", event(2, Difficulty::Easy)).unwrap();

    j.acknowledge(a.session_id, 1).unwrap();
    assert_eq!(j.get_session("B").unwrap().reviews.len(), 1);
}

#[test]
fn failed_read_drops_review_and_keeps_stored_session() {
    let store = Arc::new(ScriptedStore::default());
    let j = SessionJournal::new(store.clone());
    for card in 0..5 {
        j.append_review("d", event(card, Difficulty::Easy)).unwrap();
    }
    let before = j.get_session("d").unwrap();

    *store.fail_reads.lock() = 1;
    let out = j.append_review("d", event(5, Difficulty::Hard)).unwrap();
    assert_eq!(out, AppendOutcome::Dropped { reason: StoreError::Io("EIO".into()) });
    assert_eq!(j.get_session("d").unwrap(), before);

    let out = j.append_review("d", event(6, Difficulty::Hard)).unwrap();
    assert_eq!(
        out,
        AppendOutcome::Recorded { started_new: false, replaced_deck: None, len: 6 }
    );
}

#[test]
fn failed_read_does_not_prune() {
    let store = Arc::new(ScriptedStore::default());
    store
        .inner
        .write(JOURNAL_KEY, &serde_json::to_string(&stale_session("old", 30)).unwrap())
        .unwrap();
    *store.fail_reads.lock() = 1;
    let j = SessionJournal::new(store.clone());

    assert!(!j.prune_stale(7));
    assert_eq!(*store.deletes.lock(), 0);
    assert!(j.get_session("old").is_some());
}
