//! In-memory model of the client session.
//!
//! `ConversationStore` holds the conversation summaries, the working
//! transcript of the current conversation, the memory list, and the current
//! conversation id. All mutations are synchronous and perform no I/O; each
//! one publishes a `SessionEvent` so observers can re-render.

use std::cmp::Reverse;

use banter_types::chat::{Conversation, ConversationId, Message, MessageRole};
use banter_types::event::SessionEvent;
use banter_types::memory::{MemoryEntry, MemoryId};

use crate::event::EventBus;

/// Conversation list, working transcript, memories, and current identity.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    transcript: Vec<Message>,
    memories: Vec<MemoryEntry>,
    current: Option<ConversationId>,
    events: EventBus,
}

impl ConversationStore {
    pub fn new(events: EventBus) -> Self {
        Self {
            conversations: Vec::new(),
            transcript: Vec::new(),
            memories: Vec::new(),
            current: None,
            events,
        }
    }

    // --- Read access ---

    /// Conversation summaries, most recently updated first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn memories(&self) -> &[MemoryEntry] {
        &self.memories
    }

    pub fn current(&self) -> Option<&ConversationId> {
        self.current.as_ref()
    }

    pub fn is_current(&self, id: &ConversationId) -> bool {
        self.current.as_ref() == Some(id)
    }

    pub fn contains_conversation(&self, id: &ConversationId) -> bool {
        self.conversations.iter().any(|c| &c.id == id)
    }

    pub fn contains_memory(&self, id: &MemoryId) -> bool {
        self.memories.iter().any(|m| &m.id == id)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // --- Conversation list ---

    /// Replace the whole list with a fresh snapshot from the backend.
    pub fn replace_conversations(&mut self, mut conversations: Vec<Conversation>) {
        for conv in &mut conversations {
            conv.messages = None;
        }
        conversations.sort_by_key(|c| Reverse(c.updated_at));
        self.conversations = conversations;
        self.publish_conversations();
    }

    /// Put a newly created conversation at the top of the list.
    pub fn prepend_conversation(&mut self, conversation: Conversation) {
        self.conversations.retain(|c| c.id != conversation.id);
        self.conversations.insert(0, conversation.summary());
        self.publish_conversations();
    }

    /// Replace a conversation summary in place (e.g. after a rename).
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        let summary = conversation.summary();
        match self.conversations.iter_mut().find(|c| c.id == summary.id) {
            Some(existing) => *existing = summary,
            None => self.conversations.push(summary),
        }
        self.conversations.sort_by_key(|c| Reverse(c.updated_at));
        self.publish_conversations();
    }

    /// Remove a conversation. Returns false (and publishes nothing) if absent.
    pub fn remove_conversation(&mut self, id: &ConversationId) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| &c.id != id);
        if self.conversations.len() == before {
            return false;
        }
        self.events.publish(SessionEvent::ConversationRemoved {
            conversation_id: id.clone(),
        });
        true
    }

    pub fn set_current(&mut self, id: Option<ConversationId>) {
        if self.current == id {
            return;
        }
        self.current = id.clone();
        self.events
            .publish(SessionEvent::CurrentChanged { conversation_id: id });
    }

    // --- Working transcript ---

    pub fn append_message(&mut self, message: Message) {
        self.transcript.push(message);
        self.publish_transcript();
    }

    /// Replace the most recent message. No-op on an empty transcript.
    pub fn replace_last_message(&mut self, message: Message) -> bool {
        match self.transcript.last_mut() {
            Some(last) => {
                *last = message;
                self.publish_transcript();
                true
            }
            None => false,
        }
    }

    /// Drop the most recent message.
    pub fn pop_message(&mut self) -> Option<Message> {
        let popped = self.transcript.pop();
        if popped.is_some() {
            self.publish_transcript();
        }
        popped
    }

    /// Keep only the first `len` messages.
    pub fn truncate_to(&mut self, len: usize) {
        if len < self.transcript.len() {
            self.transcript.truncate(len);
            self.publish_transcript();
        }
    }

    pub fn replace_transcript(&mut self, messages: Vec<Message>) {
        self.transcript = messages;
        self.publish_transcript();
    }

    pub fn clear_transcript(&mut self) {
        if !self.transcript.is_empty() {
            self.transcript.clear();
            self.publish_transcript();
        }
    }

    /// Append streamed text to the trailing assistant message.
    ///
    /// Returns false when the transcript does not end in an assistant
    /// message of the current conversation.
    pub fn append_to_last(&mut self, text: &str) -> bool {
        let Some(conversation_id) = self.current.clone() else {
            return false;
        };
        let Some(last) = self.transcript.last_mut() else {
            return false;
        };
        if last.role != MessageRole::Assistant {
            return false;
        }
        last.content.push_str(text);
        self.events.publish(SessionEvent::ChunkApplied {
            conversation_id,
            text: text.to_string(),
        });
        true
    }

    // --- Memories ---

    pub fn replace_memories(&mut self, memories: Vec<MemoryEntry>) {
        self.memories = memories;
        self.events.publish(SessionEvent::MemoriesChanged {
            count: self.memories.len(),
        });
    }

    /// Remove a memory. Returns false (and publishes nothing) if absent.
    pub fn remove_memory(&mut self, id: &MemoryId) -> bool {
        let before = self.memories.len();
        self.memories.retain(|m| &m.id != id);
        if self.memories.len() == before {
            return false;
        }
        self.events
            .publish(SessionEvent::MemoryRemoved { memory_id: id.clone() });
        true
    }

    fn publish_conversations(&self) {
        self.events.publish(SessionEvent::ConversationsChanged {
            count: self.conversations.len(),
        });
    }

    fn publish_transcript(&self) {
        self.events.publish(SessionEvent::TranscriptChanged {
            len: self.transcript.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn conv(id: &str, age_minutes: i64) -> Conversation {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Conversation {
            id: ConversationId::new(id),
            title: format!("Chat {id}"),
            created_at: at,
            updated_at: at,
            messages: None,
        }
    }

    fn memory(id: &str) -> MemoryEntry {
        MemoryEntry {
            id: MemoryId::new(id),
            content: format!("fact {id}"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replace_conversations_orders_most_recent_first() {
        let mut store = ConversationStore::default();
        store.replace_conversations(vec![conv("old", 60), conv("new", 1), conv("mid", 30)]);
        let ids: Vec<&str> = store.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn replace_conversations_strips_embedded_messages() {
        let mut store = ConversationStore::default();
        let mut loaded = conv("a", 0);
        loaded.messages = Some(vec![Message::user("hi", Vec::new())]);
        store.replace_conversations(vec![loaded]);
        assert!(store.conversations()[0].messages.is_none());
    }

    #[test]
    fn prepend_conversation_puts_it_first_without_duplicates() {
        let mut store = ConversationStore::default();
        store.replace_conversations(vec![conv("a", 5), conv("b", 10)]);
        store.prepend_conversation(conv("c", 0));
        store.prepend_conversation(conv("c", 0));
        let ids: Vec<&str> = store.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn upsert_conversation_updates_title() {
        let mut store = ConversationStore::default();
        store.replace_conversations(vec![conv("a", 5), conv("b", 10)]);
        let mut renamed = conv("b", 0);
        renamed.title = "Renamed".to_string();
        store.upsert_conversation(renamed);
        assert_eq!(store.conversations()[0].title, "Renamed");
        assert_eq!(store.conversations().len(), 2);
    }

    #[test]
    fn remove_conversation_absent_is_noop() {
        let mut store = ConversationStore::default();
        store.replace_conversations(vec![conv("a", 5)]);
        assert!(!store.remove_conversation(&ConversationId::new("zzz")));
        assert_eq!(store.conversations().len(), 1);
        assert!(store.remove_conversation(&ConversationId::new("a")));
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn transcript_mutations() {
        let mut store = ConversationStore::default();
        store.append_message(Message::user("u1", Vec::new()));
        store.append_message(Message::assistant_placeholder());
        store.append_message(Message::user("u2", Vec::new()));
        assert_eq!(store.transcript().len(), 3);

        store.truncate_to(1);
        assert_eq!(store.transcript().len(), 1);
        store.truncate_to(5);
        assert_eq!(store.transcript().len(), 1);

        assert!(store.replace_last_message(Message::user("edited", Vec::new())));
        assert_eq!(store.transcript()[0].content, "edited");

        assert!(store.pop_message().is_some());
        assert!(!store.replace_last_message(Message::user("x", Vec::new())));
    }

    #[test]
    fn append_to_last_requires_assistant_tail_and_current() {
        let mut store = ConversationStore::default();
        store.append_message(Message::assistant_placeholder());
        assert!(!store.append_to_last("no current"));

        store.set_current(Some(ConversationId::new("c")));
        assert!(store.append_to_last("Hel"));
        assert!(store.append_to_last("lo"));
        assert_eq!(store.transcript()[0].content, "Hello");

        store.append_message(Message::user("u", Vec::new()));
        assert!(!store.append_to_last("!"));
    }

    #[test]
    fn remove_memory_is_idempotent() {
        let mut store = ConversationStore::default();
        store.replace_memories(vec![memory("m1"), memory("m2")]);
        assert!(store.remove_memory(&MemoryId::new("m1")));
        assert!(!store.remove_memory(&MemoryId::new("m1")));
        assert_eq!(store.memories().len(), 1);
        assert!(store.contains_memory(&MemoryId::new("m2")));
    }

    #[tokio::test]
    async fn mutations_publish_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut store = ConversationStore::new(bus);

        store.set_current(Some(ConversationId::new("c")));
        store.append_message(Message::assistant_placeholder());
        store.append_to_last("hi");

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::CurrentChanged {
                conversation_id: Some(ConversationId::new("c"))
            }
        );
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::TranscriptChanged { len: 1 });
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::ChunkApplied {
                conversation_id: ConversationId::new("c"),
                text: "hi".to_string()
            }
        );
    }
}
