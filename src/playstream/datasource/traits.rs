//! Source and sink abstraction traits.
//!
//! These traits are the engine boundary: the transport behind a source
//! (message queue, file, socket) and the index behind the sink are external
//! collaborators. Implementations only need to move opaque bytes in and
//! serialized enriched records out.

use crate::playstream::model::EnrichedRecord;
use async_trait::async_trait;

use super::error::{SinkError, SourceError};

/// A raw message as handed over by the external transport: an opaque payload
/// plus the externally-assigned read position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub payload: Vec<u8>,
    pub offset: i64,
}

impl RawMessage {
    pub fn new(payload: Vec<u8>, offset: i64) -> Self {
        Self { payload, offset }
    }
}

/// Core trait for event input sources.
///
/// `next()` produces a lazy, potentially infinite sequence of raw messages.
/// Returning `Ok(None)` signals a clean end of stream (finite sources, test
/// fixtures); the pipeline treats it like a source shutting down. Reading
/// advances the source's position, which is assumed durable externally.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Pull the next raw message, suspending while the transport has nothing.
    async fn next(&mut self) -> Result<Option<RawMessage>, SourceError>;
}

/// Core trait for the enriched-record output sink.
///
/// The pipeline batches writes; a batch either lands fully, fails
/// transiently ([`SinkError::Unavailable`], retried by the caller), or is
/// permanently rejected ([`SinkError::Rejected`], dropped and logged by the
/// caller).
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Write a batch of enriched records.
    async fn write_batch(&mut self, records: Vec<EnrichedRecord>) -> Result<(), SinkError>;

    /// Flush anything the sink itself buffers.
    async fn flush(&mut self) -> Result<(), SinkError>;
}
