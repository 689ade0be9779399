//! Wire types specific to the HTTP backend.
//!
//! Domain payloads (conversations, messages, memories) are shared from
//! `banter-types`; this module only holds request bodies and the error
//! envelope.

use serde::{Deserialize, Serialize};

/// `POST /conversations`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

/// `PUT /conversations/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateConversationBody<'a> {
    pub title: &'a str,
}

/// `{"error": {"message": "..."}}`, or the looser `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Structured { message: String },
    Text(String),
}

impl ErrorEnvelope {
    pub fn into_message(self) -> String {
        match self.error {
            ErrorDetail::Structured { message } | ErrorDetail::Text(message) => message,
        }
    }
}
