//! Stream ingestion: folds reply chunks into the in-progress assistant message.

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use banter_types::error::BackendError;

use crate::chat::session::TurnTag;

/// Where ingested chunks land.
pub trait ChunkSink {
    /// Append `text` to the placeholder addressed by `tag`.
    ///
    /// Returns false once the placeholder is no longer addressable.
    fn apply_chunk(&self, tag: &TurnTag, text: &str) -> bool;
}

/// How an ingestion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The stream ended normally after `chunks` non-empty chunks.
    Completed { chunks: usize },
    /// The stream broke; chunks applied so far stay in place.
    Failed(BackendError),
    /// The placeholder went away; the stream was dropped unfinished.
    Detached,
}

/// Applies chunks, in arrival order, to the single placeholder of one turn.
pub struct StreamIngestor<'a, K: ?Sized> {
    tag: TurnTag,
    sink: &'a K,
    cancel: CancellationToken,
}

impl<'a, K: ChunkSink + ?Sized> StreamIngestor<'a, K> {
    pub fn new(tag: TurnTag, sink: &'a K, cancel: CancellationToken) -> Self {
        Self { tag, sink, cancel }
    }

    /// Consume `stream` until it ends, fails, or the turn is detached.
    ///
    /// Returning drops the stream, which abandons the underlying request.
    pub async fn run<S>(self, stream: S) -> IngestOutcome
    where
        S: Stream<Item = Result<String, BackendError>>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut chunks = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.detached(chunks),
                next = stream.next() => next,
            };

            match next {
                None => {
                    debug!(
                        conversation_id = %self.tag.conversation_id,
                        chunks,
                        "Reply stream completed"
                    );
                    return IngestOutcome::Completed { chunks };
                }
                Some(Err(e)) => return IngestOutcome::Failed(e),
                Some(Ok(text)) if text.is_empty() => continue,
                Some(Ok(text)) => {
                    if !self.sink.apply_chunk(&self.tag, &text) {
                        return self.detached(chunks);
                    }
                    chunks += 1;
                    trace!(seq = self.tag.seq, len = text.len(), "Chunk applied");
                }
            }
        }
    }

    fn detached(&self, chunks: usize) -> IngestOutcome {
        debug!(
            conversation_id = %self.tag.conversation_id,
            seq = self.tag.seq,
            chunks,
            "Dropping reply stream for detached turn"
        );
        IngestOutcome::Detached
    }
}
