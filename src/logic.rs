//! Session drivers shared by both HTTP and WebSocket handlers.
//!
//! Each driver locks the session, asks the controller for a ticket, releases
//! the lock, awaits the backend, then locks again to apply the result. A
//! second fetch-triggering action while one is in flight is ignored and the
//! current view is returned instead.

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::DisplayedSide;
use crate::error::SessionError;
use crate::protocol::SessionView;
use crate::session::{Advance, Applied, FetchTicket};
use crate::state::{AppState, SharedSession};

async fn current_view(session: &SharedSession) -> SessionView {
  session.lock().await.view()
}

async fn run_fetch(state: &AppState, session: &SharedSession, ticket: FetchTicket) -> SessionView {
  let result = state.backend.fetch_pair(&ticket.subject).await;
  let mut c = session.lock().await;
  if c.apply_fetch(&ticket, result) == Applied::Stale {
    debug!(target: "arena", token = ticket.token, subject = %ticket.subject, "Fetch result discarded");
  }
  c.view()
}

/// Fetch-issuing actions: a duplicate while a fetch is pending is a no-op.
async fn issue_or_ignore(
  state: &AppState,
  session: &SharedSession,
  issued: Result<FetchTicket, SessionError>,
) -> Result<SessionView, SessionError> {
  match issued {
    Ok(ticket) => Ok(run_fetch(state, session, ticket).await),
    Err(SessionError::FetchInFlight) => {
      debug!(target: "arena", "Fetch already in flight; action ignored");
      Ok(current_view(session).await)
    }
    Err(e) => Err(e),
  }
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn view(state: &AppState, key: Uuid) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  Ok(current_view(&session).await)
}

#[instrument(level = "info", skip(state), fields(%key, %subject))]
pub async fn pick_subject(state: &AppState, key: Uuid, subject: &str) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let mut c = session.lock().await;
  c.pick_subject(subject)?;
  Ok(c.view())
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn pick_count(state: &AppState, key: Uuid, count: u32) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let issued = session.lock().await.pick_count(count);
  issue_or_ignore(state, &session, issued).await
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn retry(state: &AppState, key: Uuid) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let issued = session.lock().await.retry();
  issue_or_ignore(state, &session, issued).await
}

#[instrument(level = "info", skip(state), fields(%key, %side))]
pub async fn select(state: &AppState, key: Uuid, side: DisplayedSide) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let ticket = session.lock().await.select(side)?;
  let result = state.backend.commit_selection(&ticket.commit).await;
  let mut c = session.lock().await;
  c.apply_commit(&ticket, result);
  Ok(c.view())
}

#[instrument(level = "info", skip(state, feedback), fields(%key, feedback_len = feedback.len()))]
pub async fn submit_feedback(state: &AppState, key: Uuid, feedback: &str) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let ticket = session.lock().await.submit_feedback(feedback)?;
  let result = state.backend.submit_feedback(&ticket.submission).await;
  let mut c = session.lock().await;
  c.apply_feedback(&ticket, result);
  Ok(c.view())
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn advance(state: &AppState, key: Uuid) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let step = session.lock().await.advance();
  match step {
    Ok(Advance::Fetch(ticket)) => Ok(run_fetch(state, &session, ticket).await),
    Ok(Advance::Complete { .. }) => Ok(current_view(&session).await),
    Err(e) => issue_or_ignore(state, &session, Err(e)).await,
  }
}

#[instrument(level = "info", skip(state), fields(%key))]
pub async fn back(state: &AppState, key: Uuid) -> Result<SessionView, SessionError> {
  let session = state.session(key).await?;
  let mut c = session.lock().await;
  c.back_to_subjects();
  Ok(c.view())
}
