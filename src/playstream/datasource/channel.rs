//! In-memory channel-backed source and sink adapters.
//!
//! These are the adapters used when embedding the engine behind an existing
//! consumer loop, and by the test suite: the caller owns the producing half
//! of a bounded channel and feeds raw payloads in, the pipeline pulls them
//! out through the [`EventSource`] trait. Dropping the sender ends the
//! stream cleanly.

use crate::playstream::model::EnrichedRecord;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::error::{SinkError, SourceError};
use super::traits::{EventSink, EventSource, RawMessage};

/// Source adapter reading raw messages from a bounded in-memory channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<RawMessage>,
}

impl ChannelSource {
    /// Create a sender/source pair with the given channel capacity.
    pub fn pair(capacity: usize) -> (mpsc::Sender<RawMessage>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next(&mut self) -> Result<Option<RawMessage>, SourceError> {
        // A closed channel is a clean end of stream, not a transport error.
        Ok(self.rx.recv().await)
    }
}

/// Sink adapter forwarding enriched records into a bounded in-memory channel.
///
/// A full channel suspends the pipeline's sink task, which is exactly the
/// backpressure behavior expected from a real index client.
pub struct ChannelSink {
    tx: mpsc::Sender<EnrichedRecord>,
}

impl ChannelSink {
    /// Create a sink/receiver pair with the given channel capacity.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<EnrichedRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write_batch(&mut self, records: Vec<EnrichedRecord>) -> Result<(), SinkError> {
        for record in records {
            self.tx
                .send(record)
                .await
                .map_err(|_| SinkError::unavailable("output channel closed"))?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that accumulates records in memory, for tests and ad-hoc inspection.
#[derive(Default)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<EnrichedRecord>>>,
    flushes: Arc<Mutex<usize>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected records; stays valid after the sink is
    /// boxed and handed to the pipeline.
    pub fn records(&self) -> Arc<Mutex<Vec<EnrichedRecord>>> {
        Arc::clone(&self.records)
    }

    /// Shared handle to the flush counter.
    pub fn flushes(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.flushes)
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn write_batch(&mut self, records: Vec<EnrichedRecord>) -> Result<(), SinkError> {
        self.records.lock().unwrap().extend(records);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playstream::model::Coordinates;

    fn record(player_id: i64) -> EnrichedRecord {
        EnrichedRecord {
            player_id,
            player_name: None,
            ip: None,
            room_id: 1,
            room_name: None,
            room_created_at: None,
            points: 0,
            coordinates: Coordinates { x: 0, y: 0 },
        }
    }

    #[tokio::test]
    async fn channel_source_yields_messages_then_end_of_stream() {
        let (tx, mut source) = ChannelSource::pair(4);
        tx.send(RawMessage::new(b"{}".to_vec(), 1)).await.unwrap();
        drop(tx);

        let msg = source.next().await.unwrap().unwrap();
        assert_eq!(msg.offset, 1);
        assert!(source.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver_as_unavailable() {
        let (mut sink, rx) = ChannelSink::pair(4);
        drop(rx);
        let err = sink.write_batch(vec![record(1)]).await.unwrap_err();
        assert!(matches!(err, SinkError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn collecting_sink_accumulates_batches() {
        let mut sink = CollectingSink::new();
        let records = sink.records();
        sink.write_batch(vec![record(1), record(2)]).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(records.lock().unwrap().len(), 2);
        assert_eq!(*sink.flushes().lock().unwrap(), 1);
    }
}
