//! Client configuration types for Banter.
//!
//! `ClientConfig` represents the top-level `config.toml` that points the
//! client at a backend and tunes streaming, refresh, and attachment limits.

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Top-level configuration for the Banter client.
///
/// Loaded from `~/.banter/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the chat backend, without trailing slash.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Caller identity sent with every request. No identity, no backend calls.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Stream replies chunk by chunk (true) or wait for the buffered reply.
    #[serde(default = "default_streaming")]
    pub streaming: bool,

    /// Delay before refreshing memories after a completed turn. Memory
    /// extraction on the backend is eventually consistent.
    #[serde(default = "default_memory_refresh_delay_ms")]
    pub memory_refresh_delay_ms: u64,

    /// Per-request timeout for the HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest accepted attachment, in bytes before encoding.
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_streaming() -> bool {
    true
}

fn default_memory_refresh_delay_ms() -> u64 {
    3_000
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_max_attachment_bytes() -> usize {
    20 * 1024 * 1024
}

impl ClientConfig {
    pub fn memory_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.memory_refresh_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            user_id: None,
            streaming: default_streaming(),
            memory_refresh_delay_ms: default_memory_refresh_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}
