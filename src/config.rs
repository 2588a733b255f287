use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Consecutive failures at which an agent becomes UNHEALTHY. Below this
    /// (but above zero) it is DEGRADED.
    pub failure_threshold: u32,
    /// AI results below this confidence are escalated for human review.
    pub confidence_threshold: f32,
    /// Wall-clock bound for a workflow run when the caller supplies none.
    pub workflow_timeout_ms: u64,
    /// Items per payload for capabilities that support batch input.
    pub batch_chunk_size: usize,
    pub anthropic_api_key: Option<String>,
    pub database_url: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            failure_threshold: env_parse("EXPUNGE_FAILURE_THRESHOLD", 3),
            confidence_threshold: env_parse("EXPUNGE_CONFIDENCE_THRESHOLD", 0.7),
            workflow_timeout_ms: env_parse("EXPUNGE_WORKFLOW_TIMEOUT_MS", 30_000),
            batch_chunk_size: env_parse("EXPUNGE_BATCH_CHUNK_SIZE", 25),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            database_url: std::env::var("DATABASE_URL").ok(),
            port: env_parse("EXPUNGE_PORT", 8090),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            confidence_threshold: 0.7,
            workflow_timeout_ms: 30_000,
            batch_chunk_size: 25,
            anthropic_api_key: None,
            database_url: None,
            port: 8090,
        }
    }
}
