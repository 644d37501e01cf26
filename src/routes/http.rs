//! HTTP endpoint handlers. These are thin wrappers that forward to the session drivers.
//! Each handler is instrumented and logs the session key and the resulting state.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::SessionError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

fn session_out(key: Uuid, session: SessionView) -> Json<SessionOut> {
  info!(target: "arena", %key, state = session.state, "HTTP session view served");
  Json(SessionOut { session_key: key, session })
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, backend: state.backend.name() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_subjects(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(SubjectsOut {
    subjects: state.catalog.subjects.clone(),
    question_counts: state.catalog.question_counts.clone(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_preferences(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (selections, feedback) = state.backend.export().await;
  info!(target: "arena", selections = selections.len(), feedback = feedback.len(), "Preference dataset exported");
  Json(PreferencesOut { selections, feedback })
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (key, session) = state.create_session().await;
  let view = session.lock().await.view();
  (StatusCode::CREATED, session_out(key, view))
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::view(&state, key).await?))
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
) -> Result<StatusCode, SessionError> {
  if state.remove_session(key).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(SessionError::UnknownSession(key.to_string()))
  }
}

#[instrument(level = "info", skip(state, body), fields(%key, subject = %body.subject))]
pub async fn http_post_subject(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
  Json(body): Json<SubjectIn>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::pick_subject(&state, key, &body.subject).await?))
}

#[instrument(level = "info", skip(state, body), fields(%key, count = body.count))]
pub async fn http_post_count(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
  Json(body): Json<CountIn>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::pick_count(&state, key, body.count).await?))
}

#[instrument(level = "info", skip(state, body), fields(%key, side = %body.side))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
  Json(body): Json<SelectIn>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::select(&state, key, body.side).await?))
}

#[instrument(level = "info", skip(state, body), fields(%key, feedback_len = body.feedback.len()))]
pub async fn http_post_feedback(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
  Json(body): Json<FeedbackIn>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::submit_feedback(&state, key, &body.feedback).await?))
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn http_post_advance(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::advance(&state, key).await?))
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn http_post_retry(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::retry(&state, key).await?))
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn http_post_back(
  State(state): State<Arc<AppState>>,
  Path(key): Path<Uuid>,
) -> Result<Json<SessionOut>, SessionError> {
  Ok(session_out(key, logic::back(&state, key).await?))
}
