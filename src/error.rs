//! Error types: collaborator failures and controller rejections.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::protocol::ErrorOut;

/// Failure reported by the generation/persistence collaborator.
///
/// `Exhausted` and `Generic` are disjoint: only `Exhausted` moves a session
/// into the exhausted state, everything else is retried in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("no unseen questions left for subject '{subject}'")]
    Exhausted { subject: String },
    #[error("{0}")]
    Generic(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Generic(e.to_string())
    }
}

/// Rejection of an evaluator action by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("unknown subject '{0}'")]
    UnknownSubject(String),
    #[error("question count {count} is not one of {allowed:?}")]
    InvalidCount { count: u32, allowed: Vec<u32> },
    #[error("cannot {action} while in state {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("a question fetch is already in flight")]
    FetchInFlight,
    #[error("a selection is already being recorded")]
    CommitInFlight,
    #[error("feedback is empty")]
    EmptyFeedback,
    #[error("unknown session '{0}'")]
    UnknownSession(String),
}

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::UnknownSession(_) => StatusCode::NOT_FOUND,
            SessionError::InvalidTransition { .. }
            | SessionError::FetchInFlight
            | SessionError::CommitInFlight => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorOut { message: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_http_statuses() {
        assert_eq!(SessionError::UnknownSession("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(SessionError::FetchInFlight.status(), StatusCode::CONFLICT);
        assert_eq!(
            SessionError::InvalidTransition { action: "select", state: "subject_selection" }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(SessionError::EmptyFeedback.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn exhausted_message_names_subject() {
        let e = ServiceError::Exhausted { subject: "확률변수".into() };
        assert!(e.to_string().contains("확률변수"));
    }
}
