//! Attachment encoder: raw file bytes in, base64 image attachments out.
//!
//! Sources are read concurrently and yield results in completion order.
//! A failed or rejected source never aborts its siblings.

use std::future::Future;
use std::io;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::stream::{FuturesUnordered, Stream, StreamExt};
use tracing::{debug, warn};

use banter_types::chat::{Attachment, AttachmentKind};
use banter_types::error::AttachmentError;

use super::sniff::{detect_image_mime, is_image_mime, known_image_mime};

/// Anything that can hand over an attachment's bytes.
///
/// The MIME type is declared by the source (e.g. a browser-style file
/// picker or the file extension) and verified against the payload.
pub trait AttachmentSource: Send + Sync {
    fn mime_type(&self) -> &str;

    fn name(&self) -> Option<&str>;

    fn read_bytes(&self) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// Converts attachment sources into transport-safe `Attachment` records.
#[derive(Debug, Clone)]
pub struct AttachmentEncoder {
    max_bytes: usize,
}

impl AttachmentEncoder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and encode an already-read payload.
    pub fn encode_bytes(
        &self,
        mime_type: &str,
        name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Attachment, AttachmentError> {
        let display = name.unwrap_or("attachment").to_string();

        if bytes.is_empty() {
            return Err(AttachmentError::Empty { name: display });
        }
        if bytes.len() > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                name: display,
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        // Unknown image subtypes (svg, heic, ...) pass through unchecked.
        let mime_type = match known_image_mime(mime_type) {
            Some(declared) => {
                let detected = detect_image_mime(bytes);
                if detected != Some(declared) {
                    return Err(AttachmentError::MimeMismatch {
                        name: display,
                        declared: declared.to_string(),
                        detected: detected.unwrap_or("unrecognized data").to_string(),
                    });
                }
                declared.to_string()
            }
            None => mime_type.trim().to_string(),
        };

        Ok(Attachment {
            kind: AttachmentKind::Image,
            data: STANDARD.encode(bytes),
            mime_type,
            name: name.map(str::to_string),
        })
    }

    /// Read and encode every image source concurrently.
    ///
    /// Non-image sources are skipped without a result. Every image source
    /// yields exactly one item, in completion order.
    pub fn encode_all<'a, S: AttachmentSource>(
        &'a self,
        sources: &'a [S],
    ) -> impl Stream<Item = Result<Attachment, AttachmentError>> + Send + 'a {
        sources
            .iter()
            .filter(|source| {
                let accepted = is_image_mime(source.mime_type());
                if !accepted {
                    debug!(
                        name = source.name().unwrap_or("attachment"),
                        mime_type = source.mime_type(),
                        "Skipping non-image attachment"
                    );
                }
                accepted
            })
            .map(|source| self.encode_source(source))
            .collect::<FuturesUnordered<_>>()
    }

    /// Encode all sources into `pending`, returning the rejected ones.
    ///
    /// Each attachment is added to `pending` as soon as it is ready.
    pub async fn encode_into<S: AttachmentSource>(
        &self,
        sources: &[S],
        pending: &mut PendingAttachments,
    ) -> Vec<AttachmentError> {
        let mut rejected = Vec::new();
        let mut results = std::pin::pin!(self.encode_all(sources));
        while let Some(result) = results.next().await {
            match result {
                Ok(attachment) => pending.push(attachment),
                Err(e) => {
                    warn!(error = %e, "Attachment rejected");
                    rejected.push(e);
                }
            }
        }
        rejected
    }

    async fn encode_source<S: AttachmentSource>(
        &self,
        source: &S,
    ) -> Result<Attachment, AttachmentError> {
        let bytes = source
            .read_bytes()
            .await
            .map_err(|e| AttachmentError::Read {
                name: source.name().unwrap_or("attachment").to_string(),
                reason: e.to_string(),
            })?;
        self.encode_bytes(source.mime_type(), source.name(), &bytes)
    }
}

/// Attachments staged for the next user turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingAttachments {
    items: Vec<Attachment>,
}

impl PendingAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attachment: Attachment) {
        self.items.push(attachment);
    }

    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Hand the staged attachments to a send and leave the set empty.
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.items)
    }
}
