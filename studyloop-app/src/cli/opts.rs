use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(name = "studyloop", version, about = "StudyLoop review scheduler and session journal")]
pub struct Cli {
    /// Directory holding the session journal (defaults to app data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compute the next schedule for a card after one review
    Advance(AdvanceCmd),
    /// Record a graded review in the session journal
    Review(ReviewCmd),
    /// Inspect or manage the journaled session
    #[command(subcommand)]
    Session(SessionCmd),
    /// Submit the journaled session as one batch
    Submit(SubmitCmd),
    /// Launch the local HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Args, Clone)]
pub struct AdvanceCmd {
    /// 0-5, or easy / confusing / hard
    #[arg(long)]
    pub grade: String,
    #[arg(long, default_value_t = 0)]
    pub card_id: i64,
    #[arg(long, default_value_t = 0)]
    pub repetitions: u32,
    #[arg(long, default_value_t = studyloop_core::EF_DEFAULT)]
    pub ease: f64,
    #[arg(long, default_value_t = 1)]
    pub interval: u32,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    #[arg(long)]
    pub deck: String,
    #[arg(long)]
    pub card: i64,
    /// 0-5, or easy / confusing / hard
    #[arg(long)]
    pub grade: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SessionCmd {
    Show {
        #[arg(long)]
        deck: String,
    },
    Summary {
        #[arg(long)]
        deck: String,
    },
    /// Discard the journaled session without submitting it
    Abandon,
    Prune {
        #[arg(long, default_value_t = studyloop_core::DEFAULT_MAX_AGE_DAYS)]
        max_age_days: i64,
    },
}

#[derive(Debug, Args, Clone)]
pub struct SubmitCmd {
    #[arg(long)]
    pub deck: String,
    #[command(flatten)]
    pub endpoint: EndpointOpts,
}

#[derive(Debug, Args, Clone)]
pub struct EndpointOpts {
    /// URL the review batch is POSTed to
    #[arg(long)]
    pub endpoint: Option<String>,
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
    #[command(flatten)]
    pub endpoint: EndpointOpts,
}
