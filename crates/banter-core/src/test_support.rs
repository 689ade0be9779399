//! In-memory `BackendClient` for controller tests.
//!
//! Records every call, serves conversations and memories from memory, and
//! replies to chats with scripted chunk lists or channel-driven streams.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use banter_types::chat::{Conversation, ConversationId, Message};
use banter_types::error::BackendError;
use banter_types::identity::UserIdentity;
use banter_types::memory::{MemoryEntry, MemoryId};

use crate::backend::{BackendClient, ChatReply, ChatRequest, ChunkStream};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListConversations,
    CreateConversation,
    GetConversation(String),
    UpdateConversation(String, String),
    DeleteConversation(String),
    SendChat(String, ChatRequest),
    StreamChat(String, ChatRequest),
    ListMemories,
    DeleteMemory(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListConversations,
    CreateConversation,
    GetConversation,
    UpdateConversation,
    DeleteConversation,
    Chat,
    ListMemories,
    DeleteMemory,
}

pub enum Reply {
    Chunks(Vec<Result<String, BackendError>>),
    Channel(mpsc::UnboundedReceiver<Result<String, BackendError>>),
}

#[derive(Default)]
struct FakeState {
    conversations: Vec<Conversation>,
    memories: Vec<MemoryEntry>,
    calls: Vec<Call>,
    identities: Vec<String>,
    failures: HashMap<Op, BackendError>,
    replies: VecDeque<Reply>,
    get_delays: HashMap<String, Duration>,
    create_delay: Option<Duration>,
    next_id: u64,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

pub fn at(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap()
}

pub fn conversation(id: &str, minute: u32) -> Conversation {
    Conversation {
        id: ConversationId::new(id),
        title: format!("Chat {id}"),
        created_at: at(minute),
        updated_at: at(minute),
        messages: None,
    }
}

pub fn persisted(id: &str, message: Message) -> Message {
    Message {
        id: Some(id.to_string()),
        created_at: Some(at(0)),
        ..message
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversation(self, id: &str, minute: u32, messages: Vec<Message>) -> Self {
        let mut conv = conversation(id, minute);
        conv.messages = Some(messages);
        self.state.lock().conversations.push(conv);
        self
    }

    pub fn with_memory(self, id: &str, content: &str) -> Self {
        self.state.lock().memories.push(MemoryEntry {
            id: MemoryId::new(id),
            content: content.to_string(),
            created_at: at(0),
        });
        self
    }

    pub fn fail(&self, op: Op, error: BackendError) {
        self.state.lock().failures.insert(op, error);
    }

    pub fn heal(&self, op: Op) {
        self.state.lock().failures.remove(&op);
    }

    pub fn reply_chunks(&self, chunks: &[&str]) {
        let items = chunks.iter().map(|c| Ok(c.to_string())).collect();
        self.state.lock().replies.push_back(Reply::Chunks(items));
    }

    pub fn reply_items(&self, items: Vec<Result<String, BackendError>>) {
        self.state.lock().replies.push_back(Reply::Chunks(items));
    }

    /// Script a reply the test feeds chunk by chunk.
    pub fn reply_channel(&self) -> mpsc::UnboundedSender<Result<String, BackendError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().replies.push_back(Reply::Channel(rx));
        tx
    }

    pub fn delay_get(&self, id: &str, delay: Duration) {
        self.state.lock().get_delays.insert(id.to_string(), delay);
    }

    pub fn delay_create(&self, delay: Duration) {
        self.state.lock().create_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn identities(&self) -> Vec<String> {
        self.state.lock().identities.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn conversation_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .conversations
            .iter()
            .map(|c| c.id.to_string())
            .collect()
    }

    pub fn remove_conversation(&self, id: &str) {
        self.state.lock().conversations.retain(|c| c.id.as_str() != id);
    }

    fn record(&self, identity: &UserIdentity, call: Call, op: Op) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.identities.push(identity.to_string());
        match state.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_reply(&self) -> Reply {
        self.state
            .lock()
            .replies
            .pop_front()
            .unwrap_or_else(|| Reply::Chunks(vec![Ok("ok".to_string())]))
    }
}

impl BackendClient for FakeBackend {
    async fn list_conversations(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<Conversation>, BackendError> {
        self.record(identity, Call::ListConversations, Op::ListConversations)?;
        Ok(self
            .state
            .lock()
            .conversations
            .iter()
            .map(Conversation::summary)
            .collect())
    }

    async fn create_conversation(
        &self,
        identity: &UserIdentity,
        title: Option<&str>,
    ) -> Result<Conversation, BackendError> {
        self.record(identity, Call::CreateConversation, Op::CreateConversation)?;
        let delay = self.state.lock().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        state.next_id += 1;
        let mut conv = conversation(&format!("new-{}", state.next_id), 59);
        conv.title = title.unwrap_or("New Chat").to_string();
        conv.messages = Some(Vec::new());
        state.conversations.push(conv.clone());
        Ok(conv.summary())
    }

    async fn get_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
    ) -> Result<Conversation, BackendError> {
        self.record(identity, Call::GetConversation(id.to_string()), Op::GetConversation)?;
        let delay = self.state.lock().get_delays.get(id.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock();
        let conv = state
            .conversations
            .iter()
            .find(|c| &c.id == id)
            .ok_or(BackendError::NotFound)?;
        let mut loaded = conv.clone();
        loaded.messages.get_or_insert_with(Vec::new);
        Ok(loaded)
    }

    async fn update_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        title: &str,
    ) -> Result<Conversation, BackendError> {
        self.record(
            identity,
            Call::UpdateConversation(id.to_string(), title.to_string()),
            Op::UpdateConversation,
        )?;
        let mut state = self.state.lock();
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or(BackendError::NotFound)?;
        conv.title = title.to_string();
        Ok(conv.summary())
    }

    async fn delete_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
    ) -> Result<(), BackendError> {
        self.record(identity, Call::DeleteConversation(id.to_string()), Op::DeleteConversation)?;
        let mut state = self.state.lock();
        let before = state.conversations.len();
        state.conversations.retain(|c| &c.id != id);
        if state.conversations.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn send_chat(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: &ChatRequest,
    ) -> Result<ChatReply, BackendError> {
        self.record(identity, Call::SendChat(id.to_string(), request.clone()), Op::Chat)?;
        let items = match self.next_reply() {
            Reply::Chunks(items) => items,
            Reply::Channel(mut rx) => {
                let mut items = Vec::new();
                while let Some(item) = rx.recv().await {
                    items.push(item);
                }
                items
            }
        };
        let response = items.into_iter().collect::<Result<String, _>>()?;
        Ok(ChatReply { response })
    }

    fn stream_chat(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: ChatRequest,
    ) -> ChunkStream {
        if let Err(e) = self.record(identity, Call::StreamChat(id.to_string(), request), Op::Chat) {
            return Box::pin(stream::iter(vec![Err(e)]));
        }
        match self.next_reply() {
            Reply::Chunks(items) => Box::pin(stream::iter(items)),
            Reply::Channel(rx) => Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })),
        }
    }

    async fn list_memories(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<MemoryEntry>, BackendError> {
        self.record(identity, Call::ListMemories, Op::ListMemories)?;
        Ok(self.state.lock().memories.clone())
    }

    async fn delete_memory(
        &self,
        identity: &UserIdentity,
        id: &MemoryId,
    ) -> Result<(), BackendError> {
        self.record(identity, Call::DeleteMemory(id.to_string()), Op::DeleteMemory)?;
        let mut state = self.state.lock();
        let before = state.memories.len();
        state.memories.retain(|m| &m.id != id);
        if state.memories.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }
}
