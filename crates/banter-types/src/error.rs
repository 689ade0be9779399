use thiserror::Error;

/// Errors from backend calls.
///
/// Every failure of a backend call maps to exactly one of these; callers
/// treat them uniformly as "the call failed" and never retry automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request could not complete (connect, timeout, I/O).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status or an error envelope.
    #[error("backend error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Reported { status: Option<u16>, message: String },

    /// The addressed conversation or memory does not exist.
    #[error("not found")]
    NotFound,

    /// The response body did not match the expected schema.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The chunk stream broke after it had started.
    #[error("stream interrupted: {0}")]
    Stream(String),
}

/// Errors for a single attachment source. Never aborts sibling sources.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("failed to read '{name}': {reason}")]
    Read { name: String, reason: String },

    #[error("'{name}' is empty")]
    Empty { name: String },

    #[error("'{name}' is {size} bytes, limit is {limit}")]
    TooLarge { name: String, size: usize, limit: usize },

    #[error("'{name}' is declared as {declared} but looks like {detected}")]
    MimeMismatch {
        name: String,
        declared: String,
        detected: String,
    },
}

/// Errors surfaced to the user by session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("could not start a new conversation: {0}")]
    ConversationCreate(BackendError),
}

impl SessionError {
    /// The single human-readable line shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Backend(BackendError::Transport(_)) => {
                "Could not reach the chat service. Check your connection and try again.".to_string()
            }
            other => {
                let text = other.to_string();
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => text,
                }
            }
        }
    }
}
