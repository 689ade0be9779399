//! Filesystem adapters for Banter.
//!
//! Resolves the data directory that holds `config.toml` and provides the
//! file-backed `AttachmentSource`.

pub mod attachment;

use std::path::PathBuf;

pub use attachment::FileSource;

pub const DATA_DIR_ENV: &str = "BANTER_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `BANTER_DATA_DIR` environment variable
/// 2. `~/.banter`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".banter");
    }

    // Last resort: current directory
    PathBuf::from(".banter")
}
