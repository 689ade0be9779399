//! Session controller: turns user intent into backend calls and store updates.
//!
//! `SessionController` owns the `SessionState` aggregate behind a mutex that
//! is only held for short synchronous sections, never across an `.await`.
//! In-flight turns are addressed by `TurnTag`; switching, creating, or
//! deleting the current conversation detaches the turn so its late chunks
//! are dropped instead of landing in the wrong transcript.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use banter_types::chat::{Attachment, Conversation, ConversationId, Message, MessageRole};
use banter_types::config::ClientConfig;
use banter_types::error::{BackendError, SessionError};
use banter_types::event::SessionEvent;
use banter_types::identity::UserIdentity;
use banter_types::memory::{MemoryEntry, MemoryId};

use crate::backend::{BackendClient, ChatRequest, ChunkStream};
use crate::chat::ingest::{IngestOutcome, StreamIngestor};
use crate::chat::session::{Phase, SessionState, TurnTag};
use crate::event::EventBus;

/// Why an operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No caller identity is configured.
    NoIdentity,
    /// A turn is streaming or a conversation is loading.
    Busy,
    /// The operation needs a current conversation.
    NoConversation,
    /// Regenerate found no user message to answer again.
    NoUserTurn,
    /// Nothing to send or an empty title.
    EmptyInput,
    /// The id is not in the local list.
    Unknown,
}

/// Result of a session operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// A newer action took over before this one finished; nothing visible
    /// changed on its behalf.
    Superseded,
    Skipped(SkipReason),
}

/// Controller knobs derived from `ClientConfig`.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub streaming: bool,
    pub memory_refresh_delay: Duration,
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            streaming: config.streaming,
            memory_refresh_delay: config.memory_refresh_delay(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

/// How a send gets its turn going.
enum TurnStart {
    Started(TurnTag, CancellationToken),
    /// No conversation is current; the session is reserved under this id
    /// until one is created.
    NeedsConversation(u64),
}

struct Inner<B> {
    backend: Arc<B>,
    state: Mutex<SessionState>,
    events: EventBus,
    options: SessionOptions,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

/// Cheaply clonable handle to one client session.
pub struct SessionController<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for SessionController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: BackendClient> SessionController<B> {
    pub fn new(backend: Arc<B>, identity: Option<UserIdentity>, options: SessionOptions) -> Self {
        let events = EventBus::default();
        Self {
            inner: Arc::new(Inner {
                backend,
                state: Mutex::new(SessionState::new(events.clone(), identity)),
                events,
                options,
                tasks: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    // --- Observation ---

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.lock().identity().cloned()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().store().conversations().to_vec()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock().store().transcript().to_vec()
    }

    pub fn memories(&self) -> Vec<MemoryEntry> {
        self.lock().store().memories().to_vec()
    }

    pub fn current_conversation(&self) -> Option<ConversationId> {
        self.lock().store().current().cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error().map(str::to_string)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    // --- Identity ---

    /// Switch caller identity. State fetched for the previous identity is
    /// discarded.
    pub fn set_identity(&self, identity: Option<UserIdentity>) {
        if self.lock().set_identity(identity) {
            info!("Session identity changed");
        }
    }

    pub fn clear_identity(&self) {
        self.set_identity(None);
    }

    // --- Conversations ---

    /// Create an empty conversation and make it current.
    pub async fn new_chat(&self) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };

        let conversation = match self.inner.backend.create_conversation(&identity, None).await {
            Ok(conversation) => conversation,
            Err(e) => return Err(self.surface(SessionError::ConversationCreate(e))),
        };

        let id = conversation.id.clone();
        let mut state = self.lock();
        state.detach_turn();
        state.cancel_create();
        state.cancel_load();
        state.store_mut().prepend_conversation(conversation);
        state.store_mut().set_current(Some(id.clone()));
        state.store_mut().clear_transcript();
        state.clear_error();
        info!(conversation_id = %id, "Started new conversation");
        Ok(Outcome::Done)
    }

    /// Load a conversation with its messages and make it current.
    ///
    /// Overlapping selections resolve to the one issued last.
    pub async fn select_conversation(&self, id: &ConversationId) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };

        let generation = self.lock().begin_load(id.clone());
        let result = self.inner.backend.get_conversation(&identity, id).await;

        let mut state = self.lock();
        if !state.finish_load(generation) {
            debug!(conversation_id = %id, "Conversation load superseded");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(mut conversation) => {
                let messages = conversation.messages.take().unwrap_or_default();
                state.detach_turn();
                state.cancel_create();
                state.store_mut().upsert_conversation(conversation);
                state.store_mut().set_current(Some(id.clone()));
                state.store_mut().replace_transcript(messages);
                state.clear_error();
                debug!(
                    conversation_id = %id,
                    messages = state.store().transcript().len(),
                    "Conversation loaded"
                );
                Ok(Outcome::Done)
            }
            Err(e) => {
                drop(state);
                Err(self.surface(e.into()))
            }
        }
    }

    /// Delete a conversation. Ids missing from the local list are ignored.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };
        if !self.lock().store().contains_conversation(id) {
            return Ok(Outcome::Skipped(SkipReason::Unknown));
        }

        match self.inner.backend.delete_conversation(&identity, id).await {
            Ok(()) | Err(BackendError::NotFound) => {}
            Err(e) => return Err(self.surface(e.into())),
        }

        let mut state = self.lock();
        state.store_mut().remove_conversation(id);
        if state.is_loading(id) {
            state.cancel_load();
        }
        if state.store().is_current(id) {
            state.detach_turn();
            state.store_mut().set_current(None);
            state.store_mut().clear_transcript();
        }
        info!(conversation_id = %id, "Conversation deleted");
        Ok(Outcome::Done)
    }

    pub async fn rename_conversation(
        &self,
        id: &ConversationId,
        title: &str,
    ) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };
        let title = title.trim();
        if title.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::EmptyInput));
        }

        match self.inner.backend.update_conversation(&identity, id, title).await {
            Ok(updated) => {
                self.lock().store_mut().upsert_conversation(updated);
                info!(conversation_id = %id, "Conversation renamed");
                Ok(Outcome::Done)
            }
            Err(e) => Err(self.surface(e.into())),
        }
    }

    /// Replace the conversation list with the backend's.
    ///
    /// Errors are returned to the caller but not recorded as the session
    /// error; background refreshes only log them.
    pub async fn refresh_conversations(&self) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };
        let conversations = self.inner.backend.list_conversations(&identity).await?;

        let mut state = self.lock();
        if state.identity() != Some(&identity) {
            return Ok(Outcome::Superseded);
        }
        state.store_mut().replace_conversations(conversations);
        Ok(Outcome::Done)
    }

    // --- Memories ---

    pub async fn refresh_memories(&self) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };
        let memories = self.inner.backend.list_memories(&identity).await?;

        let mut state = self.lock();
        if state.identity() != Some(&identity) {
            return Ok(Outcome::Superseded);
        }
        state.store_mut().replace_memories(memories);
        Ok(Outcome::Done)
    }

    /// Delete a memory. Ids missing from the local list are ignored.
    pub async fn delete_memory(&self, id: &MemoryId) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };
        if !self.lock().store().contains_memory(id) {
            return Ok(Outcome::Skipped(SkipReason::Unknown));
        }

        match self.inner.backend.delete_memory(&identity, id).await {
            Ok(()) | Err(BackendError::NotFound) => {}
            Err(e) => return Err(self.surface(e.into())),
        }

        self.lock().store_mut().remove_memory(id);
        info!(memory_id = %id, "Memory deleted");
        Ok(Outcome::Done)
    }

    // --- Turns ---

    /// Send a user turn and stream the reply into the transcript.
    ///
    /// Creates a conversation first when none is current. On failure the
    /// user message stays and the assistant placeholder is removed.
    pub async fn send_message(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Outcome, SessionError> {
        let text = text.trim();
        if text.is_empty() && attachments.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::EmptyInput));
        }
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };

        let start = {
            let mut state = self.lock();
            if state.is_busy() {
                return Ok(Outcome::Skipped(SkipReason::Busy));
            }
            match state.store().current().cloned() {
                Some(id) => {
                    let (tag, cancel) = Self::start_turn(&mut state, id, text, &attachments);
                    TurnStart::Started(tag, cancel)
                }
                None => TurnStart::NeedsConversation(state.begin_create()),
            }
        };

        let (tag, cancel) = match start {
            TurnStart::Started(tag, cancel) => (tag, cancel),
            TurnStart::NeedsConversation(reservation) => {
                let result = self.inner.backend.create_conversation(&identity, None).await;
                let mut state = self.lock();
                let reserved = state.finish_create(reservation);
                let conversation = match result {
                    Ok(conversation) => conversation,
                    Err(e) if reserved => {
                        drop(state);
                        return Err(self.surface(SessionError::ConversationCreate(e)));
                    }
                    Err(e) => {
                        warn!(error = %e, "Superseded conversation creation failed");
                        return Ok(Outcome::Superseded);
                    }
                };

                let id = conversation.id.clone();
                // It exists on the backend either way; list it for its owner.
                if state.identity() == Some(&identity) {
                    state.store_mut().prepend_conversation(conversation);
                }
                if !reserved {
                    debug!(conversation_id = %id, "First message superseded during creation");
                    return Ok(Outcome::Superseded);
                }
                if state.is_busy() {
                    return Ok(Outcome::Skipped(SkipReason::Busy));
                }
                info!(conversation_id = %id, "Created conversation for first message");
                state.store_mut().set_current(Some(id.clone()));
                state.store_mut().clear_transcript();
                Self::start_turn(&mut state, id, text, &attachments)
            }
        };

        let request = ChatRequest {
            content: text.to_string(),
            attachments,
        };
        self.run_turn(identity, tag, cancel, request).await
    }

    /// Answer the most recent user message again.
    pub async fn regenerate(&self) -> Result<Outcome, SessionError> {
        let Some(identity) = self.identity() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentity));
        };

        let (tag, cancel, request) = {
            let mut state = self.lock();
            if state.is_busy() {
                return Ok(Outcome::Skipped(SkipReason::Busy));
            }
            let Some(id) = state.store().current().cloned() else {
                return Ok(Outcome::Skipped(SkipReason::NoConversation));
            };

            let snapshot = state.store().transcript().to_vec();
            let Some(index) = snapshot.iter().rposition(|m| m.role == MessageRole::User) else {
                return Ok(Outcome::Skipped(SkipReason::NoUserTurn));
            };
            let user = &snapshot[index];
            let request = ChatRequest {
                content: user.content.clone(),
                attachments: user.attachments.clone(),
            };

            state.clear_error();
            state.store_mut().truncate_to(index + 1);
            state.store_mut().append_message(Message::assistant_placeholder());
            let (tag, cancel) = state.begin_turn(id);
            (tag, cancel, request)
        };

        debug!(conversation_id = %tag.conversation_id, "Regenerating last reply");
        self.run_turn(identity, tag, cancel, request).await
    }

    fn start_turn(
        state: &mut SessionState,
        id: ConversationId,
        text: &str,
        attachments: &[Attachment],
    ) -> (TurnTag, CancellationToken) {
        state.clear_error();
        state
            .store_mut()
            .append_message(Message::user(text, attachments.to_vec()));
        state.store_mut().append_message(Message::assistant_placeholder());
        state.begin_turn(id)
    }

    async fn run_turn(
        &self,
        identity: UserIdentity,
        tag: TurnTag,
        cancel: CancellationToken,
        request: ChatRequest,
    ) -> Result<Outcome, SessionError> {
        let chunks = self.reply_stream(&identity, &tag.conversation_id, request);
        let outcome = StreamIngestor::new(tag.clone(), &self.inner.state, cancel)
            .run(chunks)
            .await;

        match outcome {
            IngestOutcome::Completed { .. } => {
                if !self.lock().finish_turn(&tag, true) {
                    return Ok(Outcome::Superseded);
                }
                self.spawn_refreshes(identity);
                Ok(Outcome::Done)
            }
            IngestOutcome::Detached => Ok(Outcome::Superseded),
            IngestOutcome::Failed(e) => {
                {
                    let mut state = self.lock();
                    if !state.finish_turn(&tag, false) {
                        warn!(
                            conversation_id = %tag.conversation_id,
                            error = %e,
                            "Detached turn failed"
                        );
                        return Ok(Outcome::Superseded);
                    }
                    let placeholder = state
                        .store()
                        .transcript()
                        .last()
                        .is_some_and(|m| m.role == MessageRole::Assistant);
                    if placeholder {
                        state.store_mut().pop_message();
                    }
                }
                Err(self.surface(e.into()))
            }
        }
    }

    /// Streaming mode asks for chunks; buffered mode delivers the whole reply
    /// as a single chunk.
    fn reply_stream(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: ChatRequest,
    ) -> ChunkStream {
        if self.inner.options.streaming {
            return self.inner.backend.stream_chat(identity, id, request);
        }
        let backend = Arc::clone(&self.inner.backend);
        let identity = identity.clone();
        let id = id.clone();
        Box::pin(stream::once(async move {
            backend
                .send_chat(&identity, &id, &request)
                .await
                .map(|reply| reply.response)
        }))
    }

    /// Pick up the server-computed title now and extracted memories later.
    fn spawn_refreshes(&self, identity: UserIdentity) {
        let this = self.clone();
        self.inner.tasks.spawn(async move {
            if let Err(e) = this.refresh_conversations().await {
                warn!(user = %identity, error = %e, "Conversation list refresh failed");
            }
        });

        let this = self.clone();
        let delay = self.inner.options.memory_refresh_delay;
        let shutdown = self.inner.shutdown.clone();
        self.inner.tasks.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = this.refresh_memories().await {
                        warn!(error = %e, "Memory refresh failed");
                    }
                }
            }
        });
    }

    // --- Lifecycle ---

    /// Wait until every background refresh spawned so far has finished.
    pub async fn wait_for_background(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Cancel pending deferred work and the in-flight turn, then wait for
    /// background tasks to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.lock().detach_turn();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        debug!("Session controller shut down");
    }

    fn surface(&self, error: SessionError) -> SessionError {
        let message = error.user_message();
        warn!(error = %error, "Session operation failed");
        self.lock().record_error(message);
        error
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock()
    }
}
