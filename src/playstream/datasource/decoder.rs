//! Raw payload decoding: opaque bytes into typed [`SourceEvent`]s.
//!
//! One decoder instance per stream. Decoding parses the JSON payload, pulls
//! the logical event timestamp out of it per the stream's [`EventTimeSpec`],
//! and deserializes the typed payload. Malformed payloads surface as
//! [`SourceError::Decode`] - the caller skips and counts them, they never
//! kill the stream.

use crate::playstream::model::{
    ActivityEvent, EventPayload, PlayerEvent, RoomEvent, SourceEvent, StreamId,
};
use serde_json::Value;

use super::error::SourceError;
use super::event_time::{processing_time, EventTimeSpec};
use super::traits::RawMessage;

/// Decodes raw messages from one stream into typed source events.
#[derive(Debug, Clone)]
pub struct StreamDecoder {
    stream: StreamId,
    event_time: Option<EventTimeSpec>,
}

impl StreamDecoder {
    /// Decoder with the default event-time configuration for the stream:
    /// rooms read `created_at`, activity reads an `event_time` field when the
    /// producer includes one, players have no timestamp field in their schema
    /// and use arrival time.
    pub fn for_stream(stream: StreamId) -> Self {
        let event_time = match stream {
            StreamId::Rooms => Some(EventTimeSpec::epoch_millis("created_at")),
            StreamId::Players => None,
            StreamId::Activity => Some(EventTimeSpec::epoch_millis("event_time")),
        };
        Self { stream, event_time }
    }

    /// Override the event-time extraction for this stream.
    pub fn with_event_time(mut self, spec: EventTimeSpec) -> Self {
        self.event_time = Some(spec);
        self
    }

    /// Use arrival time for every message on this stream.
    pub fn with_processing_time(mut self) -> Self {
        self.event_time = None;
        self
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Decode one raw message.
    pub fn decode(&self, raw: &RawMessage) -> Result<SourceEvent, SourceError> {
        let value: Value = serde_json::from_slice(&raw.payload)
            .map_err(|e| SourceError::decode(self.stream, raw.offset, e.to_string()))?;

        let event_time = self.resolve_event_time(&value, raw.offset)?;
        let payload = self.decode_payload(value, raw.offset)?;

        Ok(SourceEvent {
            stream: self.stream,
            payload,
            event_time,
            offset: raw.offset,
        })
    }

    /// Event time from the configured field, arrival time when the stream has
    /// no spec or the producer omitted the field. A present-but-garbage value
    /// is a decode error rather than a silent fallback.
    fn resolve_event_time(&self, value: &Value, offset: i64) -> Result<i64, SourceError> {
        let Some(spec) = &self.event_time else {
            return Ok(processing_time());
        };
        if value.get(&spec.field).is_none() {
            return Ok(processing_time());
        }
        spec.extract(value)
            .map_err(|e| SourceError::decode(self.stream, offset, e.to_string()))
    }

    fn decode_payload(&self, value: Value, offset: i64) -> Result<EventPayload, SourceError> {
        let decoded = match self.stream {
            StreamId::Rooms => serde_json::from_value::<RoomEvent>(value).map(EventPayload::Room),
            StreamId::Players => {
                serde_json::from_value::<PlayerEvent>(value).map(EventPayload::Player)
            }
            StreamId::Activity => {
                serde_json::from_value::<ActivityEvent>(value).map(EventPayload::Activity)
            }
        };
        decoded.map_err(|e| SourceError::decode(self.stream, offset, e.to_string()))
    }
}
