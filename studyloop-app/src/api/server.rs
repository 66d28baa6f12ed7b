use axum::{
    routing::{delete, get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{
    abandon_session, advance_schedule, get_session, post_review, session_summary, submit_session,
    AppState,
};
use studyloop_core::{SessionJournal, SubmissionCoordinator, Submitter};

pub fn router(journal: Arc<SessionJournal>, submitter: Option<Arc<dyn Submitter>>) -> Router {
    let coordinator = submitter.map(|s| Arc::new(SubmissionCoordinator::new(journal.clone(), s)));
    let state = Arc::new(AppState { journal, coordinator });

    Router::new()
        .route("/sessions/:deck", get(get_session))
        .route("/sessions/:deck/reviews", post(post_review))
        .route("/sessions/:deck/summary", get(session_summary))
        .route("/sessions/:deck/submit", post(submit_session))
        .route("/session", delete(abandon_session))
        .route("/schedule/advance", post(advance_schedule))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(
    journal: Arc<SessionJournal>,
    submitter: Option<Arc<dyn Submitter>>,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let app = router(journal, submitter);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
