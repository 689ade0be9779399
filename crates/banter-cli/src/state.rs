//! Application state wiring the session controller to the HTTP backend.
//!
//! Configuration is layered: defaults, then `config.toml` in the data
//! directory, then environment variables, then command-line flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use banter_core::attachment::AttachmentEncoder;
use banter_core::chat::{SessionController, SessionOptions};
use banter_infra::config::{apply_env_overrides, load_client_config};
use banter_infra::filesystem::resolve_data_dir;
use banter_infra::http::HttpBackendClient;
use banter_types::config::ClientConfig;
use banter_types::identity::UserIdentity;

/// Session controller pinned to the HTTP backend.
pub type ConcreteSession = SessionController<HttpBackendClient>;

/// Flag values that win over file and environment configuration.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub user_id: Option<String>,
    pub no_stream: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = self.backend_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.backend_url = url.to_string();
        }
        if let Some(user) = self.user_id.as_deref().filter(|u| !u.trim().is_empty()) {
            config.user_id = Some(user.to_string());
        }
        if self.no_stream {
            config.streaming = false;
        }
    }
}

/// Shared state for every CLI command.
pub struct AppState {
    pub config: ClientConfig,
    pub session: ConcreteSession,
    pub encoder: AttachmentEncoder,
    pub data_dir: PathBuf,
}

impl AppState {
    pub async fn init(overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let mut config = load_client_config(&data_dir).await;
        apply_env_overrides(&mut config);
        overrides.apply(&mut config);

        let backend = HttpBackendClient::from_config(&config)
            .with_context(|| format!("Invalid backend URL '{}'", config.backend_url))?;

        let identity = config.user_id.as_deref().and_then(UserIdentity::new);
        if identity.is_none() {
            tracing::warn!("No user identity configured; backend calls are disabled");
        }

        let session =
            SessionController::new(Arc::new(backend), identity, SessionOptions::from(&config));
        let encoder = AttachmentEncoder::new(config.max_attachment_bytes);

        Ok(Self {
            config,
            session,
            encoder,
            data_dir,
        })
    }
}
