//! Event types for the Banter session event bus.
//!
//! `SessionEvent` is published on every state mutation of the session so
//! that presentation layers can re-render without polling. All variants are
//! Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::chat::ConversationId;
use crate::memory::MemoryId;

/// Events emitted by the conversation store and session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The conversation list was replaced or reordered.
    ConversationsChanged { count: usize },

    /// A conversation was removed from the list.
    ConversationRemoved { conversation_id: ConversationId },

    /// The current conversation changed (or was cleared).
    CurrentChanged {
        conversation_id: Option<ConversationId>,
    },

    /// The working transcript changed structurally (append, truncate, replace).
    TranscriptChanged { len: usize },

    /// A streamed chunk was appended to the in-progress assistant message.
    ChunkApplied {
        conversation_id: ConversationId,
        text: String,
    },

    /// The memory list was replaced.
    MemoriesChanged { count: usize },

    /// A memory entry was removed.
    MemoryRemoved { memory_id: MemoryId },

    /// A send or regenerate turn started streaming.
    TurnStarted { conversation_id: ConversationId },

    /// A turn finished; `ok` is false when it failed and was rolled back.
    TurnFinished {
        conversation_id: ConversationId,
        ok: bool,
    },

    /// An error was surfaced to the user.
    ErrorRaised { message: String },
}
