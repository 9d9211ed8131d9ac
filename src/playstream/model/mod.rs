//! Core event types for the enrichment engine.
//!
//! This module contains the typed events decoded from the three input
//! streams, the enriched output record, and the [`SourceEvent`] envelope that
//! carries the logical event timestamp assigned at decode time.
//!
//! All event timestamps are milliseconds since the Unix epoch, stored as
//! `i64`. Wall-clock types never appear in the hot path; conversion happens
//! once, at the decode boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the three input streams feeding the engine.
///
/// The engine is wired for exactly these streams; watermarks are tracked per
/// stream and the combined watermark is the minimum across all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    /// Room-creation dimension events
    Rooms,
    /// Player-registration dimension events
    Players,
    /// Player-activity fact events
    Activity,
}

impl StreamId {
    /// All streams, in routing order.
    pub const ALL: [StreamId; 3] = [StreamId::Rooms, StreamId::Players, StreamId::Activity];

    /// Dense index for per-stream arrays.
    pub fn index(&self) -> usize {
        match self {
            StreamId::Rooms => 0,
            StreamId::Players => 1,
            StreamId::Activity => 2,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamId::Rooms => write!(f, "rooms"),
            StreamId::Players => write!(f, "players"),
            StreamId::Activity => write!(f, "activity"),
        }
    }
}

/// A room-creation event.
///
/// Immutable once observed; the dimension store keeps the latest value per
/// `id` by event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEvent {
    pub id: i64,
    pub room_name: String,
    /// Creation timestamp in epoch milliseconds; doubles as the event time
    /// for this stream under the default decoder configuration.
    pub created_at: i64,
}

/// A player-registration event, keyed by `player_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub player_id: i64,
    pub player_name: String,
    pub ip: String,
}

/// In-game coordinates attached to an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

/// A player-activity fact event.
///
/// Activity events are never mutated after decode; each one triggers exactly
/// one [`EnrichedRecord`] emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub player_id: i64,
    pub room_id: i64,
    pub points: i32,
    pub coordinates: Coordinates,
}

/// Decoded payload of a single source message.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Room(RoomEvent),
    Player(PlayerEvent),
    Activity(ActivityEvent),
}

/// Envelope produced by a source adapter: the typed payload plus the logical
/// event timestamp and the externally-assigned read position.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    /// Which stream this event arrived on
    pub stream: StreamId,
    /// The decoded, typed payload
    pub payload: EventPayload,
    /// Logical event time in epoch milliseconds, assigned at decode
    pub event_time: i64,
    /// Offset/position assigned by the external transport
    pub offset: i64,
}

/// The enriched output record: one per activity event, left-join semantics.
///
/// Dimension fields are `None` when the corresponding dimension had not been
/// seen by the time the enrichment decision became terminal (fast path or
/// watermark-triggered flush). `None` serializes as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub player_id: i64,
    pub player_name: Option<String>,
    pub ip: Option<String>,
    pub room_id: i64,
    pub room_name: Option<String>,
    pub room_created_at: Option<i64>,
    pub points: i32,
    pub coordinates: Coordinates,
}

impl EnrichedRecord {
    /// Build an enriched record from an activity and whatever dimension state
    /// is currently known. Missing dimensions become `None`.
    pub fn from_parts(
        activity: &ActivityEvent,
        room: Option<&RoomEvent>,
        player: Option<&PlayerEvent>,
    ) -> Self {
        Self {
            player_id: activity.player_id,
            player_name: player.map(|p| p.player_name.clone()),
            ip: player.map(|p| p.ip.clone()),
            room_id: activity.room_id,
            room_name: room.map(|r| r.room_name.clone()),
            room_created_at: room.map(|r| r.created_at),
            points: activity.points,
            coordinates: activity.coordinates,
        }
    }

    /// True when both dimensions were resolved.
    pub fn is_fully_enriched(&self) -> bool {
        self.player_name.is_some() && self.room_name.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enriched_record_nulls_serialize_as_json_null() {
        let activity = ActivityEvent {
            player_id: 9,
            room_id: 2,
            points: 10,
            coordinates: Coordinates { x: 0, y: 0 },
        };
        let record = EnrichedRecord::from_parts(&activity, None, None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["room_name"].is_null());
        assert!(json["room_created_at"].is_null());
        assert!(json["player_name"].is_null());
        assert!(json["ip"].is_null());
        assert_eq!(json["player_id"], 9);
    }

    #[test]
    fn from_parts_copies_dimension_values() {
        let activity = ActivityEvent {
            player_id: 9,
            room_id: 1,
            points: 50,
            coordinates: Coordinates { x: 1, y: 2 },
        };
        let room = RoomEvent {
            id: 1,
            room_name: "Classic".to_string(),
            created_at: 100,
        };
        let player = PlayerEvent {
            player_id: 9,
            player_name: "Ann".to_string(),
            ip: "1.2.3.4".to_string(),
        };
        let record = EnrichedRecord::from_parts(&activity, Some(&room), Some(&player));
        assert!(record.is_fully_enriched());
        assert_eq!(record.room_name.as_deref(), Some("Classic"));
        assert_eq!(record.room_created_at, Some(100));
        assert_eq!(record.player_name.as_deref(), Some("Ann"));
        assert_eq!(record.ip.as_deref(), Some("1.2.3.4"));
    }
}
