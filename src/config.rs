//! Loading arena configuration (subject catalog, question counts, local bank
//! size) from TOML, plus the environment-level upstream settings.
//!
//! See `ArenaConfig` and `UpstreamSettings` for the expected schema.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{DEFAULT_QUESTION_COUNTS, DEFAULT_SUBJECTS};

/// TOML schema. Every field is optional.
///
/// ```toml
/// subjects = ["알고리즘설계", "확률변수"]
/// question_counts = [5, 10, 20]
/// local_pool_size = 10
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct ArenaConfig {
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,
    #[serde(default = "default_question_counts")]
    pub question_counts: Vec<u32>,
    #[serde(default = "default_local_pool_size")]
    pub local_pool_size: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            subjects: default_subjects(),
            question_counts: default_question_counts(),
            local_pool_size: default_local_pool_size(),
        }
    }
}

fn default_subjects() -> Vec<String> {
    DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect()
}

fn default_question_counts() -> Vec<u32> {
    DEFAULT_QUESTION_COUNTS.to_vec()
}

fn default_local_pool_size() -> u64 {
    10
}

impl ArenaConfig {
    /// Drop unusable entries; fall back to defaults if a list ends up empty.
    pub fn sanitized(mut self) -> Self {
        self.subjects.retain(|s| !s.trim().is_empty());
        self.subjects.dedup();
        if self.subjects.is_empty() {
            warn!(target: "quiz_arena_backend", "Config lists no subjects; using defaults");
            self.subjects = default_subjects();
        }
        self.question_counts.retain(|&c| c > 0);
        self.question_counts.sort_unstable();
        self.question_counts.dedup();
        if self.question_counts.is_empty() {
            warn!(target: "quiz_arena_backend", "Config lists no usable question counts; using defaults");
            self.question_counts = default_question_counts();
        }
        self
    }

    pub fn catalog(&self) -> Catalog {
        Catalog {
            subjects: self.subjects.clone(),
            question_counts: self.question_counts.clone(),
        }
    }
}

/// What an evaluator may pick: subjects and per-session question counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    pub subjects: Vec<String>,
    pub question_counts: Vec<u32>,
}

impl Catalog {
    pub fn has_subject(&self, subject: &str) -> bool {
        self.subjects.iter().any(|s| s == subject)
    }

    pub fn allows_count(&self, count: u32) -> bool {
        self.question_counts.contains(&count)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        ArenaConfig::default().catalog()
    }
}

/// Parse TOML text into a sanitized config.
pub fn parse_arena_config(text: &str) -> Result<ArenaConfig, toml::de::Error> {
    toml::from_str::<ArenaConfig>(text).map(ArenaConfig::sanitized)
}

/// Attempt to load `ArenaConfig` from ARENA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_arena_config_from_env() -> Option<ArenaConfig> {
    let path = std::env::var("ARENA_CONFIG_PATH").ok()?;
    match std::fs::read_to_string(&path) {
        Ok(s) => match parse_arena_config(&s) {
            Ok(cfg) => {
                info!(target: "quiz_arena_backend", %path, subjects = cfg.subjects.len(), "Loaded arena config (TOML)");
                Some(cfg)
            }
            Err(e) => {
                error!(target: "quiz_arena_backend", %path, error = %e, "Failed to parse TOML config");
                None
            }
        },
        Err(e) => {
            error!(target: "quiz_arena_backend", %path, error = %e, "Failed to read TOML config file");
            None
        }
    }
}

/// Where the generation/persistence service lives. Read from the environment.
#[derive(Clone, Debug)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl UpstreamSettings {
    /// None when ARENA_API_BASE_URL is unset or blank.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("ARENA_API_BASE_URL").ok()?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return None;
        }
        let timeout_secs = std::env::var("ARENA_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(20);
        Some(Self { base_url, timeout_secs })
    }
}
