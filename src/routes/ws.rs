//! WebSocket upgrade + message loop. Each connection owns one evaluator
//! session; every client message is forwarded to the session drivers and
//! answered with a single JSON message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quiz_arena_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (key, _) = state.create_session().await;
  info!(target: "quiz_arena_backend", %key, "WebSocket connected");

  if let Ok(session) = logic::view(&state, key).await {
    let hello = ServerWsMessage::Session { session_key: key, session };
    if send_json(&mut socket, &hello).await.is_err() {
      state.remove_session(key).await;
      return;
    }
  }

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quiz_arena_backend", %key, "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, key).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        if let Err(e) = send_json(&mut socket, &reply_msg).await {
          error!(target: "quiz_arena_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  state.remove_session(key).await;
  info!(target: "quiz_arena_backend", %key, "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

#[instrument(level = "info", skip(state), fields(%key))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, key: Uuid) -> ServerWsMessage {
  let result = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,
    ClientWsMessage::PickSubject { subject } => logic::pick_subject(state, key, &subject).await,
    ClientWsMessage::PickCount { count } => logic::pick_count(state, key, count).await,
    ClientWsMessage::Select { side } => logic::select(state, key, side).await,
    ClientWsMessage::SubmitFeedback { feedback } => logic::submit_feedback(state, key, &feedback).await,
    ClientWsMessage::Advance => logic::advance(state, key).await,
    ClientWsMessage::Retry => logic::retry(state, key).await,
    ClientWsMessage::Back => logic::back(state, key).await,
  };

  match result {
    Ok(session) => {
      info!(target: "arena", %key, state = session.state, "WS session update");
      ServerWsMessage::Session { session_key: key, session }
    }
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ArenaConfig;
  use crate::logic::tests::{pair, ScriptedBackend};

  #[tokio::test]
  async fn ws_messages_drive_the_session() {
    let backend = Arc::new(ScriptedBackend::with_fetches(vec![Ok(pair(1))]));
    let state = AppState::with_backend(&ArenaConfig::default(), backend.clone());
    let (key, _) = state.create_session().await;

    let reply = handle_client_ws(ClientWsMessage::PickSubject { subject: "확률변수".into() }, &state, key).await;
    assert!(matches!(reply, ServerWsMessage::Session { ref session, .. } if session.state == "count_selection"));

    let reply = handle_client_ws(ClientWsMessage::PickCount { count: 10 }, &state, key).await;
    match reply {
      ServerWsMessage::Session { session, session_key } => {
        assert_eq!(session_key, key);
        assert_eq!(session.state, "comparing");
        assert_eq!(session.target, Some(10));
      }
      other => panic!("unexpected reply {other:?}"),
    }

    let reply = handle_client_ws(ClientWsMessage::Retry, &state, key).await;
    assert!(matches!(reply, ServerWsMessage::Error { .. }));
    assert!(matches!(handle_client_ws(ClientWsMessage::Ping, &state, key).await, ServerWsMessage::Pong));
  }
}
