//! Client configuration loader for Banter.
//!
//! Reads `config.toml` from the data directory (`~/.banter/` in production)
//! and deserializes it into [`ClientConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::Path;

use banter_types::config::ClientConfig;

pub const BACKEND_URL_ENV: &str = "BANTER_BACKEND_URL";
pub const USER_ID_ENV: &str = "BANTER_USER_ID";

/// Load client configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ClientConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_client_config(data_dir: &Path) -> ClientConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ClientConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ClientConfig::default();
        }
    };

    match toml::from_str::<ClientConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ClientConfig::default()
        }
    }
}

/// Apply `BANTER_BACKEND_URL` / `BANTER_USER_ID` on top of the file config.
pub fn apply_env_overrides(config: &mut ClientConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply overrides from `lookup`. Empty values are ignored.
pub fn apply_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(BACKEND_URL_ENV) {
        config.backend_url = url;
    }
    if let Some(user) = non_empty(USER_ID_ENV) {
        config.user_id = Some(user);
    }
}
