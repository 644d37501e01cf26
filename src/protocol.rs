//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bank::{FeedbackRecord, PreferenceRecord};
use crate::domain::{DisplayedSide, QuestionRecord};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    PickSubject {
        subject: String,
    },
    PickCount {
        count: u32,
    },
    Select {
        side: DisplayedSide,
    },
    SubmitFeedback {
        feedback: String,
    },
    Advance,
    Retry,
    Back,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        #[serde(rename = "sessionKey")]
        session_key: Uuid,
        session: SessionView,
    },
    Error {
        message: String,
    },
}

/// What the evaluator's screen needs. Displayed questions are already in
/// A/B order; the true generator behind each side is never included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub state: &'static str,
    pub subject: Option<String>,
    pub target: Option<u32>,
    pub completed: Option<u32>,
    #[serde(rename = "questionA")]
    pub question_a: Option<QuestionRecord>,
    #[serde(rename = "questionB")]
    pub question_b: Option<QuestionRecord>,
    pub chosen: Option<DisplayedSide>,
    #[serde(rename = "fetchPending")]
    pub fetch_pending: bool,
    #[serde(rename = "commitPending")]
    pub commit_pending: bool,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    pub notice: Option<String>,
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionKey")]
    pub session_key: Uuid,
    pub session: SessionView,
}

#[derive(Deserialize)]
pub struct SubjectIn {
    pub subject: String,
}

#[derive(Deserialize)]
pub struct CountIn {
    pub count: u32,
}

#[derive(Deserialize)]
pub struct SelectIn {
    pub side: DisplayedSide,
}

#[derive(Deserialize)]
pub struct FeedbackIn {
    pub feedback: String,
}

#[derive(Serialize)]
pub struct SubjectsOut {
    pub subjects: Vec<String>,
    #[serde(rename = "questionCounts")]
    pub question_counts: Vec<u32>,
}

#[derive(Serialize)]
pub struct PreferencesOut {
    pub selections: Vec<PreferenceRecord>,
    pub feedback: Vec<FeedbackRecord>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub backend: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"select","side":"B"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::Select { side: DisplayedSide::B }));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"pick_count","count":10}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::PickCount { count: 10 }));
        assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"select","side":"left"}"#).is_err());
    }

    #[test]
    fn server_error_message_is_tagged() {
        let v = serde_json::to_value(ServerWsMessage::Error { message: "boom".into() }).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["message"], "boom");
    }
}
