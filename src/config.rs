//! Runtime configuration for the assistant.
//!
//! All knobs have working defaults so tests and demos run without any
//! environment; [`RagConfig::from_env`] layers `.env` (via `dotenvy`) and
//! process environment variables on top.

use std::env;
use std::path::PathBuf;

/// Configuration consumed by the retrieval core.
///
/// Model and embedding identifiers are opaque pass-through strings; the core
/// never interprets them.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Character budget per content chunk.
    pub chunk_size: usize,
    /// Character budget for the sentence overlap carried across chunk seams.
    pub chunk_overlap: usize,
    /// Result cap for content-index queries.
    pub max_results: usize,
    /// Exchanges retained per conversation session.
    pub max_history: usize,
    /// Anthropic model identifier.
    pub anthropic_model: String,
    /// Anthropic API key; empty means "not configured".
    pub anthropic_api_key: String,
    /// Base URL of the Anthropic-compatible endpoint.
    pub anthropic_base_url: String,
    /// Embedding model identifier, passed through to the provider.
    pub embedding_model: String,
    /// Base URL of the embedding service (Ollama-compatible).
    pub embedding_base_url: String,
    /// Vector width of the embedding model; fixed into the index schema.
    pub embedding_dims: usize,
    /// Path of the sqlite database holding both vector collections.
    pub db_path: PathBuf,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_results: 5,
            max_history: 2,
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            anthropic_api_key: String::new(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            embedding_model: "all-minilm".to_string(),
            embedding_base_url: "http://localhost:11434".to_string(),
            embedding_dims: 384,
            db_path: PathBuf::from("./course_index.sqlite"),
        }
    }
}

impl RagConfig {
    /// Build a configuration from `.env` and the process environment.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        let config = Self {
            chunk_size: parse_env("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: parse_env("CHUNK_OVERLAP", defaults.chunk_overlap),
            max_results: parse_env("MAX_RESULTS", defaults.max_results),
            max_history: parse_env("MAX_HISTORY", defaults.max_history),
            anthropic_model: string_env("ANTHROPIC_MODEL", defaults.anthropic_model),
            anthropic_api_key: string_env("ANTHROPIC_API_KEY", defaults.anthropic_api_key),
            anthropic_base_url: string_env("ANTHROPIC_BASE_URL", defaults.anthropic_base_url),
            embedding_model: string_env("EMBEDDING_MODEL", defaults.embedding_model),
            embedding_base_url: string_env("EMBEDDING_BASE_URL", defaults.embedding_base_url),
            embedding_dims: parse_env("EMBEDDING_DIMS", defaults.embedding_dims),
            db_path: string_env(
                "COURSE_DB_PATH",
                defaults.db_path.to_string_lossy().into_owned(),
            )
            .into(),
        };
        config.warn_on_degenerate_caps();
        config
    }

    /// A zero result cap silently blanks every search; accept it but say so.
    pub fn warn_on_degenerate_caps(&self) {
        if self.max_results == 0 {
            tracing::warn!("max_results is 0; every content search will return no hits");
        }
        if self.max_history == 0 {
            tracing::warn!("max_history is 0; sessions will carry no context");
        }
    }
}

fn string_env(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
