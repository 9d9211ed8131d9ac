//! Source and sink error taxonomy.
//!
//! Errors split by recovery policy rather than by transport:
//! - [`SourceError::Decode`] - one bad message; skip, count, continue
//! - [`SourceError::Unavailable`] - transport loss; retry that source with backoff
//! - [`SinkError::Rejected`] - permanently bad outgoing record(s); log and drop
//! - [`SinkError::Unavailable`] - transient sink failure; retry with backoff,
//!   backpressuring upstream through the bounded output queue

use crate::playstream::model::StreamId;
use thiserror::Error;

/// Errors produced while reading or decoding from a source adapter.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A single malformed payload. Never fatal to the stream.
    #[error("decode error on {stream} stream at offset {offset}: {message}")]
    Decode {
        stream: StreamId,
        offset: i64,
        message: String,
    },

    /// The transport behind the source is gone or unreachable.
    #[error("source {stream} unavailable: {message}")]
    Unavailable { stream: StreamId, message: String },
}

impl SourceError {
    pub fn decode(stream: StreamId, offset: i64, message: impl Into<String>) -> Self {
        SourceError::Decode {
            stream,
            offset,
            message: message.into(),
        }
    }

    pub fn unavailable(stream: StreamId, message: impl Into<String>) -> Self {
        SourceError::Unavailable {
            stream,
            message: message.into(),
        }
    }

    /// True for errors that should pause and retry the source rather than
    /// skip a single message.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable { .. })
    }
}

/// Errors produced while writing enriched records to the sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink permanently refused the record(s), e.g. schema mismatch.
    #[error("sink rejected {count} record(s): {message}")]
    Rejected { count: usize, message: String },

    /// The sink is temporarily unreachable; the write should be retried.
    #[error("sink unavailable: {message}")]
    Unavailable { message: String },
}

impl SinkError {
    pub fn rejected(count: usize, message: impl Into<String>) -> Self {
        SinkError::Rejected {
            count,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        SinkError::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Unavailable { .. })
    }
}
