//! Application state: arena config, the evaluation backend, and the live
//! evaluator sessions.
//!
//! Each session is an independent `SessionController` behind its own mutex.
//! The mutex is only held while the controller computes a transition, never
//! across a backend call.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::backend::EvaluationBackend;
use crate::bank::LocalBank;
use crate::config::{load_arena_config_from_env, ArenaConfig, Catalog, UpstreamSettings};
use crate::error::SessionError;
use crate::presentation::RandomSwap;
use crate::session::SessionController;
use crate::upstream::GeneratorClient;

pub type SharedSession = Arc<Mutex<SessionController>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
    pub backend: Arc<dyn EvaluationBackend>,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Build state from env: load config, pick upstream client or local bank.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_arena_config_from_env().unwrap_or_default();

        let upstream = UpstreamSettings::from_env().and_then(|settings| {
            match GeneratorClient::new(&settings) {
                Ok(client) => {
                    info!(target: "quiz_arena_backend", base_url = %client.base_url, timeout_secs = settings.timeout_secs, "Upstream generation service enabled.");
                    Some(client)
                }
                Err(e) => {
                    error!(target: "quiz_arena_backend", error = %e, "Failed to build upstream client; using local bank.");
                    None
                }
            }
        });

        let backend: Arc<dyn EvaluationBackend> = match upstream {
            Some(client) => Arc::new(client),
            None => {
                info!(target: "quiz_arena_backend", pool = cfg.local_pool_size, "No ARENA_API_BASE_URL. Using local question bank.");
                Arc::new(LocalBank::new(cfg.subjects.clone(), cfg.local_pool_size))
            }
        };

        Self::with_backend(&cfg, backend)
    }

    pub fn with_backend(cfg: &ArenaConfig, backend: Arc<dyn EvaluationBackend>) -> Self {
        info!(target: "quiz_arena_backend", subjects = cfg.subjects.len(), question_counts = ?cfg.question_counts, backend = backend.name(), "Arena catalog ready");
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            backend,
            catalog: Arc::new(cfg.catalog()),
        }
    }

    /// Register a fresh evaluator session at SubjectSelection.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> (Uuid, SharedSession) {
        let key = Uuid::new_v4();
        let controller = SessionController::new(self.catalog.clone(), Box::new(RandomSwap::from_entropy()));
        let shared = Arc::new(Mutex::new(controller));
        self.sessions.write().await.insert(key, shared.clone());
        info!(target: "arena", %key, "Session created");
        (key, shared)
    }

    #[instrument(level = "debug", skip(self), fields(%key))]
    pub async fn session(&self, key: Uuid) -> Result<SharedSession, SessionError> {
        self.sessions
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(key.to_string()))
    }

    #[instrument(level = "debug", skip(self), fields(%key))]
    pub async fn remove_session(&self, key: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&key).is_some();
        if removed {
            info!(target: "arena", %key, "Session discarded");
        }
        removed
    }
}
