//! Quiz Arena · blind A/B evaluation backend
//!
//! Evaluators compare two generated quiz questions for the same subject
//! without knowing which generator produced which, and pick the better one.
//! Selections and free-text feedback form a preference dataset.
//!
//! - Axum HTTP + WebSocket API hosting evaluator sessions
//! - Upstream generation/persistence service (via ARENA_API_BASE_URL), or a
//!   built-in local question bank when unset
//! - Static evaluator frontend (./static/index.html)
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   ARENA_API_BASE_URL      : base address of the generation service
//!   ARENA_HTTP_TIMEOUT_SECS : upstream request timeout (default 20)
//!   ARENA_CONFIG_PATH       : path to TOML config (subjects, question counts, local pool size)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod presentation;
mod progress;
mod session;
mod backend;
mod bank;
mod upstream;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: catalog, backend, live sessions.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_arena_backend", %addr, backend = state.backend.name(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quiz_arena_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "quiz_arena_backend", error = %e, "Failed to listen for ctrl-c");
  }
}
