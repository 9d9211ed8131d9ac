//! Source and sink adapters: the engine's boundary with the outside world.
//!
//! A source adapter turns opaque transport messages into typed events with a
//! logical event timestamp; the sink adapter serializes enriched records for
//! the external index. Transport mechanics (partitioning, offsets, broker
//! replication) live behind the [`EventSource`]/[`EventSink`] traits.

pub mod channel;
pub mod decoder;
pub mod error;
pub mod event_time;
pub mod retry;
pub mod traits;

pub use channel::{ChannelSink, ChannelSource, CollectingSink};
pub use decoder::StreamDecoder;
pub use error::{SinkError, SourceError};
pub use event_time::{EventTimeError, EventTimeSpec, TimestampFormat};
pub use retry::RetryPolicy;
pub use traits::{EventSink, EventSource, RawMessage};
