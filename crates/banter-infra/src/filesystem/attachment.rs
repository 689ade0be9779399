//! File-backed attachment source.

use std::io;
use std::path::{Path, PathBuf};

use banter_core::attachment::AttachmentSource;

/// An attachment read from disk. The MIME type comes from the extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: Option<String>,
    mime_type: &'static str,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let mime_type = mime_for_path(&path);
        Self {
            path,
            name,
            mime_type,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttachmentSource for FileSource {
    fn mime_type(&self) -> &str {
        self.mime_type
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "txt" | "md" => "text/plain",
        "pdf" => "application/pdf",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
