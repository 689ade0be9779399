//! Conversation session: store, stream ingestion, and the controller that
//! drives them against a `BackendClient`.

pub mod controller;
pub mod ingest;
pub mod session;
pub mod store;

pub use controller::{Outcome, SessionController, SessionOptions, SkipReason};
pub use ingest::{ChunkSink, IngestOutcome, StreamIngestor};
pub use session::{Phase, SessionState, TurnTag};
pub use store::ConversationStore;
