//! Image attachment encoding.
//!
//! `AttachmentEncoder` turns `AttachmentSource`s into base64 `Attachment`
//! records; the infra layer supplies file-backed sources.

pub mod encoder;
pub mod sniff;

pub use encoder::{AttachmentEncoder, AttachmentSource, PendingAttachments};
