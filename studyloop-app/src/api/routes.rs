use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use studyloop_core::{
    advance_with, summarize, CardSchedule, CoreError, ReviewEvent, SessionJournal, SessionSummary,
    StudySession, SubmissionCoordinator, SubmissionResult, EF_MIN,
};

use crate::api::dto::{AdvanceIn, ReviewIn, ReviewOut};

pub struct AppState {
    pub journal: Arc<SessionJournal>,
    pub coordinator: Option<Arc<SubmissionCoordinator>>,
}

fn status_for(e: &CoreError) -> StatusCode {
    match e {
        CoreError::InvalidGrade(_) | CoreError::InvalidLabel(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::NoSession(_) => StatusCode::NOT_FOUND,
        CoreError::SubmissionFailed(_) => StatusCode::BAD_GATEWAY,
        CoreError::SubmissionInFlight => StatusCode::CONFLICT,
        CoreError::Storage(_) | CoreError::JournalInconsistent(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn post_review(
    State(st): State<Arc<AppState>>,
    Path(deck): Path<String>,
    Json(body): Json<ReviewIn>,
) -> Result<(StatusCode, Json<ReviewOut>), StatusCode> {
    let event = ReviewEvent::at(body.card_id, body.grade, body.timestamp.unwrap_or_else(Utc::now));
    let outcome = st
        .journal
        .append_review(&deck, event)
        .map_err(|e| status_for(&e))?;
    let code = if outcome.is_recorded() { StatusCode::CREATED } else { StatusCode::OK };
    Ok((code, Json(outcome.into())))
}

pub async fn get_session(
    State(st): State<Arc<AppState>>,
    Path(deck): Path<String>,
) -> Result<Json<StudySession>, StatusCode> {
    st.journal.get_session(&deck).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn session_summary(
    State(st): State<Arc<AppState>>,
    Path(deck): Path<String>,
) -> Result<Json<SessionSummary>, StatusCode> {
    let s = st.journal.get_session(&deck).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(summarize(&s.reviews)))
}

pub async fn abandon_session(State(st): State<Arc<AppState>>) -> Result<StatusCode, StatusCode> {
    st.journal.abandon().map_err(|e| status_for(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Runs on its own task: a client hanging up does not cancel a submission
/// that may already have reached the backend.
pub async fn submit_session(
    State(st): State<Arc<AppState>>,
    Path(deck): Path<String>,
) -> Result<Json<SubmissionResult>, StatusCode> {
    let coordinator = st.coordinator.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    let result = coordinator.spawn_submit(deck).await.map_err(|e| {
        warn!(error = %e, "submission task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    result.map(Json).map_err(|e| status_for(&e))
}

pub async fn advance_schedule(Json(body): Json<AdvanceIn>) -> Result<Json<CardSchedule>, StatusCode> {
    if body.schedule.ease_factor < EF_MIN || body.schedule.interval_days == 0 {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    Ok(Json(advance_with(&body.schedule, body.grade, Utc::now())))
}
