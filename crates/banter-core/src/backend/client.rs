//! BackendClient trait definition.
//!
//! Uses RPITIT for the request/response calls and `Pin<Box<dyn Stream>>`
//! for `stream_chat` (the stream must outlive the call and be movable into
//! the ingestor).

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

use banter_types::chat::{Attachment, Conversation, ConversationId};
use banter_types::error::BackendError;
use banter_types::identity::UserIdentity;
use banter_types::memory::{MemoryEntry, MemoryId};

/// Ordered, finite stream of reply text fragments.
///
/// Fragment boundaries are arbitrary: a fragment may be empty, hold part of
/// a word, or several words.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send + 'static>>;

/// Body of `POST /conversations/{id}/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Buffered reply of the chat endpoint.
///
/// This is the only accepted shape; anything else is a malformed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Client for the chat backend.
///
/// Every call carries the caller identity. Implementations live in
/// banter-infra (e.g., `HttpBackendClient`).
pub trait BackendClient: Send + Sync + 'static {
    /// List conversation summaries.
    fn list_conversations(
        &self,
        identity: &UserIdentity,
    ) -> impl Future<Output = Result<Vec<Conversation>, BackendError>> + Send;

    /// Create a conversation, optionally with a title.
    fn create_conversation(
        &self,
        identity: &UserIdentity,
        title: Option<&str>,
    ) -> impl Future<Output = Result<Conversation, BackendError>> + Send;

    /// Load a conversation including its messages.
    fn get_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
    ) -> impl Future<Output = Result<Conversation, BackendError>> + Send;

    /// Rename a conversation.
    fn update_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        title: &str,
    ) -> impl Future<Output = Result<Conversation, BackendError>> + Send;

    /// Delete a conversation and its messages.
    fn delete_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Send a user turn and wait for the complete reply.
    fn send_chat(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, BackendError>> + Send;

    /// Send a user turn and receive the reply as a chunk stream.
    ///
    /// The request is issued when the stream is first polled; dropping the
    /// stream abandons the request.
    fn stream_chat(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: ChatRequest,
    ) -> ChunkStream;

    /// List memory entries.
    fn list_memories(
        &self,
        identity: &UserIdentity,
    ) -> impl Future<Output = Result<Vec<MemoryEntry>, BackendError>> + Send;

    /// Delete a memory entry.
    fn delete_memory(
        &self,
        identity: &UserIdentity,
        id: &MemoryId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
