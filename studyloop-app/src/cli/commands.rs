use crate::api::server as api_server;
use crate::cli::opts::*;
use crate::submitter::HttpSubmitter;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use studyloop_core::{
    advance_with, summarize, AppendOutcome, CardSchedule, KvStore, ReviewEvent, ReviewGrade,
    SessionJournal, SubmissionCoordinator, Submitter,
};
use studyloop_json::FileStore;
use tracing::warn;

pub async fn run_cli(args: Cli) -> Result<()> {
    match args.cmd {
        Command::Advance(cmd) => advance_cmd(cmd),
        Command::Review(cmd) => {
            let journal = open_journal(&args.data_dir)?;
            review_cmd(&journal, cmd)
        }
        Command::Session(cmd) => {
            let journal = open_journal(&args.data_dir)?;
            session_cmd(&journal, cmd)
        }
        Command::Submit(cmd) => {
            let journal = Arc::new(open_journal(&args.data_dir)?);
            let submitter = open_submitter(&cmd.endpoint)?
                .ok_or_else(|| anyhow!("--endpoint is required to submit"))?;
            let coordinator = SubmissionCoordinator::new(journal, submitter);
            let result = coordinator.submit_session(&cmd.deck).await?;
            println!("submitted {} review(s) for {}", result.submitted, result.deck_id);
            Ok(())
        }
        Command::Api(api) => {
            let journal = Arc::new(open_journal(&args.data_dir)?);
            let submitter = open_submitter(&api.endpoint)?;
            if submitter.is_none() {
                warn!("no --endpoint given; submissions through the API are disabled");
            }
            let addr: std::net::SocketAddr = api.addr.parse()?;
            api_server::run(journal, submitter, addr).await
        }
    }
}

pub fn open_journal(data_dir: &Option<std::path::PathBuf>) -> Result<SessionJournal> {
    let store: Arc<dyn KvStore> = match data_dir {
        Some(dir) => Arc::new(FileStore::open(dir.clone())?),
        None => Arc::new(FileStore::open_default()?),
    };
    Ok(SessionJournal::new(store))
}

fn open_submitter(opts: &EndpointOpts) -> Result<Option<Arc<dyn Submitter>>> {
    match &opts.endpoint {
        Some(url) => {
            let s = HttpSubmitter::new(url.clone(), Duration::from_secs(opts.timeout_secs))?;
            Ok(Some(Arc::new(s)))
        }
        None => Ok(None),
    }
}

fn advance_cmd(cmd: AdvanceCmd) -> Result<()> {
    let grade: ReviewGrade = cmd.grade.parse()?;
    let mut schedule = CardSchedule::new(cmd.card_id);
    schedule.repetitions = cmd.repetitions;
    schedule.ease_factor = cmd.ease;
    schedule.interval_days = cmd.interval;
    if schedule.ease_factor < studyloop_core::EF_MIN || schedule.interval_days == 0 {
        bail!("--ease must be at least {} and --interval at least 1", studyloop_core::EF_MIN);
    }
    let next = advance_with(&schedule, grade, Utc::now());
    println!("{}", serde_json::to_string_pretty(&next)?);
    Ok(())
}

fn review_cmd(journal: &SessionJournal, cmd: ReviewCmd) -> Result<()> {
    let grade: ReviewGrade = cmd.grade.parse()?;
    match journal.append_review(&cmd.deck, ReviewEvent::new(cmd.card, grade))? {
        AppendOutcome::Recorded { len, replaced_deck, .. } => {
            if let Some(prev) = replaced_deck {
                println!("discarded unsubmitted session for deck {prev}");
            }
            println!("recorded ({len} in session)");
        }
        AppendOutcome::Dropped { reason } => {
            println!("review not saved: {reason}");
        }
    }
    Ok(())
}

fn session_cmd(journal: &SessionJournal, cmd: SessionCmd) -> Result<()> {
    match cmd {
        SessionCmd::Show { deck } => match journal.get_session(&deck) {
            Some(s) => println!("{}", serde_json::to_string_pretty(&s)?),
            None => println!("no session for {deck}"),
        },
        SessionCmd::Summary { deck } => {
            let s = journal
                .get_session(&deck)
                .ok_or_else(|| anyhow!("no session for {deck}"))?;
            let summary = summarize(&s.reviews);
            let t = &summary.totals;
            println!(
                "{} review(s): easy={} confusing={} hard={} accuracy={:.0}%",
                t.total,
                t.easy,
                t.confusing,
                t.hard,
                t.accuracy() * 100.0
            );
            for (card, totals) in &summary.per_card {
                println!("{card}\t{}\tpassed={}", totals.total, totals.passed);
            }
        }
        SessionCmd::Abandon => {
            journal.abandon()?;
            println!("ok");
        }
        SessionCmd::Prune { max_age_days } => {
            let removed = journal.prune_stale(max_age_days);
            println!("{}", if removed { "pruned" } else { "nothing to prune" });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as Days;
    use studyloop_core::{Difficulty, StudySession, JOURNAL_KEY};

    fn write_session_started(dir: &std::path::Path, days_ago: i64) {
        let then = Utc::now() - Days::days(days_ago);
        let session = StudySession::start("d", ReviewEvent::at(1, Difficulty::Easy, then), then);
        let store = FileStore::open(dir).unwrap();
        store
            .write(JOURNAL_KEY, &serde_json::to_string(&session).unwrap())
            .unwrap();
    }

    #[test]
    fn opening_keeps_old_unsubmitted_session() {
        let dir = tempfile::tempdir().unwrap();
        write_session_started(dir.path(), 10);

        let journal = open_journal(&Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(journal.get_session("d").unwrap().reviews.len(), 1);
    }

    #[test]
    fn prune_honours_requested_age() {
        let dir = tempfile::tempdir().unwrap();
        write_session_started(dir.path(), 10);
        let journal = open_journal(&Some(dir.path().to_path_buf())).unwrap();

        session_cmd(&journal, SessionCmd::Prune { max_age_days: 30 }).unwrap();
        assert!(journal.get_session("d").is_some());

        session_cmd(&journal, SessionCmd::Prune { max_age_days: 7 }).unwrap();
        assert!(journal.get_session("d").is_none());
    }
}
