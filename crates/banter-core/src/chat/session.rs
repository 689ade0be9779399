//! Session state aggregate.
//!
//! `SessionState` bundles the conversation store with the fields that decide
//! what the session is doing: identity, the active turn, a conversation
//! being created for the first message, the pending conversation load, and
//! the last surfaced error. It is only ever mutated
//! through the transitions below, under the controller's lock.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use banter_types::chat::ConversationId;
use banter_types::event::SessionEvent;
use banter_types::identity::UserIdentity;

use crate::chat::ingest::ChunkSink;
use crate::chat::store::ConversationStore;
use crate::event::EventBus;

/// Address of an in-flight assistant placeholder.
///
/// A chunk is applied only while its tag is the session's active turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TurnTag {
    pub conversation_id: ConversationId,
    pub seq: u64,
}

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    /// A conversation is being created for the first message of a send.
    Creating,
    Loading,
}

#[derive(Debug)]
struct ActiveTurn {
    tag: TurnTag,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct PendingLoad {
    generation: u64,
    target: ConversationId,
}

/// The single mutable aggregate behind a `SessionController`.
#[derive(Debug)]
pub struct SessionState {
    store: ConversationStore,
    identity: Option<UserIdentity>,
    active_turn: Option<ActiveTurn>,
    turn_seq: u64,
    load: Option<PendingLoad>,
    load_generation: u64,
    create: Option<u64>,
    create_seq: u64,
    last_error: Option<String>,
}

impl SessionState {
    pub fn new(events: EventBus, identity: Option<UserIdentity>) -> Self {
        Self {
            store: ConversationStore::new(events),
            identity,
            active_turn: None,
            turn_seq: 0,
            load: None,
            load_generation: 0,
            create: None,
            create_seq: 0,
            last_error: None,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn phase(&self) -> Phase {
        if self.active_turn.is_some() {
            Phase::Sending
        } else if self.create.is_some() {
            Phase::Creating
        } else if self.load.is_some() {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    /// A turn is streaming, a conversation is being created for one, or a
    /// conversation is loading.
    pub fn is_busy(&self) -> bool {
        self.phase() != Phase::Idle
    }

    // --- Turns ---

    /// Start a turn against `conversation_id`. The caller has already
    /// appended the placeholder and checked that the session is idle.
    pub fn begin_turn(&mut self, conversation_id: ConversationId) -> (TurnTag, CancellationToken) {
        self.turn_seq += 1;
        let tag = TurnTag {
            conversation_id: conversation_id.clone(),
            seq: self.turn_seq,
        };
        let cancel = CancellationToken::new();
        self.active_turn = Some(ActiveTurn {
            tag: tag.clone(),
            cancel: cancel.clone(),
        });
        self.store
            .events()
            .publish(SessionEvent::TurnStarted { conversation_id });
        (tag, cancel)
    }

    pub fn is_active_turn(&self, tag: &TurnTag) -> bool {
        self.active_turn.as_ref().is_some_and(|t| &t.tag == tag)
    }

    /// End the turn addressed by `tag`. Returns false if it was detached.
    pub fn finish_turn(&mut self, tag: &TurnTag, ok: bool) -> bool {
        if !self.is_active_turn(tag) {
            return false;
        }
        self.active_turn = None;
        self.store.events().publish(SessionEvent::TurnFinished {
            conversation_id: tag.conversation_id.clone(),
            ok,
        });
        true
    }

    /// Let go of the in-flight turn: its stream is cancelled and any chunk
    /// still addressed to it is dropped.
    pub fn detach_turn(&mut self) {
        if let Some(turn) = self.active_turn.take() {
            debug!(
                conversation_id = %turn.tag.conversation_id,
                seq = turn.tag.seq,
                "Detaching in-flight turn"
            );
            turn.cancel.cancel();
        }
    }

    // --- Implicit conversation creation ---

    /// Reserve the session while a send creates its conversation.
    pub fn begin_create(&mut self) -> u64 {
        self.create_seq += 1;
        self.create = Some(self.create_seq);
        self.create_seq
    }

    /// Release the reservation `seq`. Returns false if it was cancelled.
    pub fn finish_create(&mut self, seq: u64) -> bool {
        if self.create == Some(seq) {
            self.create = None;
            true
        } else {
            false
        }
    }

    /// Drop the reservation so the pending send gives up its conversation.
    pub fn cancel_create(&mut self) {
        if let Some(seq) = self.create.take() {
            debug!(seq, "Cancelling pending conversation creation");
        }
    }

    // --- Conversation loads ---

    /// Register a load of `target`; the latest registered load wins.
    pub fn begin_load(&mut self, target: ConversationId) -> u64 {
        self.load_generation += 1;
        self.load = Some(PendingLoad {
            generation: self.load_generation,
            target,
        });
        self.load_generation
    }

    /// End the load with `generation`. Returns false if it was superseded.
    pub fn finish_load(&mut self, generation: u64) -> bool {
        match &self.load {
            Some(load) if load.generation == generation => {
                self.load = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending load, if any, so its result is ignored.
    pub fn cancel_load(&mut self) {
        if self.load.take().is_some() {
            self.load_generation += 1;
        }
    }

    pub fn is_loading(&self, id: &ConversationId) -> bool {
        self.load.as_ref().is_some_and(|l| &l.target == id)
    }

    // --- Errors ---

    pub fn record_error(&mut self, message: String) {
        self.store
            .events()
            .publish(SessionEvent::ErrorRaised { message: message.clone() });
        self.last_error = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // --- Identity ---

    /// Switch identity. Everything fetched under the old identity is dropped.
    pub fn set_identity(&mut self, identity: Option<UserIdentity>) -> bool {
        if self.identity == identity {
            return false;
        }
        self.detach_turn();
        self.cancel_create();
        self.cancel_load();
        self.identity = identity;
        self.last_error = None;
        self.store.set_current(None);
        self.store.clear_transcript();
        self.store.replace_conversations(Vec::new());
        self.store.replace_memories(Vec::new());
        true
    }
}

impl ChunkSink for Mutex<SessionState> {
    fn apply_chunk(&self, tag: &TurnTag, text: &str) -> bool {
        let mut state = self.lock();
        if !state.is_active_turn(tag) || !state.store.is_current(&tag.conversation_id) {
            return false;
        }
        state.store.append_to_last(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_types::chat::Message;

    fn state() -> SessionState {
        SessionState::new(EventBus::default(), UserIdentity::new("alice"))
    }

    #[test]
    fn new_state_is_idle() {
        let state = state();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!state.is_busy());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn turn_lifecycle() {
        let mut state = state();
        let (tag, cancel) = state.begin_turn(ConversationId::new("c"));
        assert_eq!(state.phase(), Phase::Sending);
        assert!(state.is_active_turn(&tag));

        assert!(state.finish_turn(&tag, true));
        assert!(!state.finish_turn(&tag, true));
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn detach_cancels_and_forgets_turn() {
        let mut state = state();
        let (tag, cancel) = state.begin_turn(ConversationId::new("c"));
        state.detach_turn();
        assert!(cancel.is_cancelled());
        assert!(!state.is_active_turn(&tag));
        assert!(!state.finish_turn(&tag, false));
    }

    #[test]
    fn turn_tags_are_unique_per_turn() {
        let mut state = state();
        let (first, _) = state.begin_turn(ConversationId::new("c"));
        state.detach_turn();
        let (second, _) = state.begin_turn(ConversationId::new("c"));
        assert_ne!(first, second);
        assert!(!state.is_active_turn(&first));
    }

    #[test]
    fn latest_load_wins() {
        let mut state = state();
        let first = state.begin_load(ConversationId::new("a"));
        let second = state.begin_load(ConversationId::new("b"));
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.is_loading(&ConversationId::new("b")));

        assert!(!state.finish_load(first));
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.finish_load(second));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn cancelled_load_is_ignored() {
        let mut state = state();
        let generation = state.begin_load(ConversationId::new("a"));
        state.cancel_load();
        assert!(!state.finish_load(generation));
        assert!(!state.is_busy());
    }

    #[test]
    fn create_reservation_makes_session_busy() {
        let mut state = state();
        let seq = state.begin_create();
        assert_eq!(state.phase(), Phase::Creating);
        assert!(state.is_busy());

        assert!(state.finish_create(seq));
        assert!(!state.finish_create(seq));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn cancelled_create_reservation_is_not_released_twice() {
        let mut state = state();
        let first = state.begin_create();
        state.cancel_create();
        assert!(!state.is_busy());
        assert!(!state.finish_create(first));

        let second = state.begin_create();
        assert_ne!(first, second);
        assert!(!state.finish_create(first));
        assert_eq!(state.phase(), Phase::Creating);
    }

    #[test]
    fn identity_change_cancels_create_reservation() {
        let mut state = state();
        let seq = state.begin_create();
        assert!(state.set_identity(UserIdentity::new("bob")));
        assert!(!state.is_busy());
        assert!(!state.finish_create(seq));
    }

    #[test]
    fn chunk_sink_respects_active_tag() {
        let sink = Mutex::new(state());
        let tag = {
            let mut state = sink.lock();
            state.store_mut().set_current(Some(ConversationId::new("c")));
            state.store_mut().append_message(Message::assistant_placeholder());
            state.begin_turn(ConversationId::new("c")).0
        };
        assert!(sink.apply_chunk(&tag, "hi"));

        sink.lock().detach_turn();
        assert!(!sink.apply_chunk(&tag, " there"));
        assert_eq!(sink.lock().store().transcript()[0].content, "hi");
    }

    #[test]
    fn set_identity_resets_session() {
        let mut state = state();
        state.store_mut().set_current(Some(ConversationId::new("c")));
        state.store_mut().append_message(Message::user("hi", Vec::new()));
        state.record_error("boom".to_string());

        assert!(!state.set_identity(UserIdentity::new("alice")));
        assert!(state.set_identity(None));
        assert!(state.identity().is_none());
        assert!(state.store().current().is_none());
        assert!(state.store().transcript().is_empty());
        assert!(state.last_error().is_none());
    }
}
