//! Keyed dimension state store.
//!
//! Holds the latest known value per `room_id` and per `player_id`.
//! Overwrite policy is last-writer-wins by *event time*, not arrival time:
//! a later-arriving dimension event with an older logical timestamp is
//! dropped as stale. Ties go to arrival order (the newer arrival wins).
//!
//! Entries persist for the pipeline's lifetime. Unbounded growth is an
//! accepted trade-off; TTL/compaction is an extension point, not core
//! correctness.

use crate::playstream::model::{PlayerEvent, RoomEvent};
use std::collections::HashMap;

/// A stored dimension value plus the event time that versioned it.
#[derive(Debug, Clone)]
struct Versioned<T> {
    value: T,
    event_time: i64,
}

/// Statistics for monitoring dimension-store behavior.
#[derive(Debug, Default, Clone)]
pub struct DimensionStats {
    /// Room upserts applied (insert or overwrite)
    pub rooms_applied: u64,
    /// Player upserts applied
    pub players_applied: u64,
    /// Updates dropped because a newer event time was already stored
    pub stale_drops: u64,
}

/// Latest-value-per-key store for the two dimension streams.
#[derive(Debug, Default)]
pub struct DimensionStore {
    rooms: HashMap<i64, Versioned<RoomEvent>>,
    players: HashMap<i64, Versioned<PlayerEvent>>,
    stats: DimensionStats,
}

/// Write iff the key is absent or the new event time is >= the stored one.
fn upsert<T>(map: &mut HashMap<i64, Versioned<T>>, key: i64, value: T, event_time: i64) -> bool {
    if let Some(existing) = map.get(&key) {
        if existing.event_time > event_time {
            return false;
        }
    }
    map.insert(key, Versioned { value, event_time });
    true
}

impl DimensionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a room, returning whether the write was applied.
    pub fn upsert_room(&mut self, room: RoomEvent, event_time: i64) -> bool {
        let applied = upsert(&mut self.rooms, room.id, room, event_time);
        if applied {
            self.stats.rooms_applied += 1;
        } else {
            self.stats.stale_drops += 1;
        }
        applied
    }

    /// Upsert a player, returning whether the write was applied.
    pub fn upsert_player(&mut self, player: PlayerEvent, event_time: i64) -> bool {
        let applied = upsert(&mut self.players, player.player_id, player, event_time);
        if applied {
            self.stats.players_applied += 1;
        } else {
            self.stats.stale_drops += 1;
        }
        applied
    }

    /// Point read; never blocks, `None` if the key has not been seen.
    pub fn room(&self, id: i64) -> Option<&RoomEvent> {
        self.rooms.get(&id).map(|v| &v.value)
    }

    pub fn player(&self, id: i64) -> Option<&PlayerEvent> {
        self.players.get(&id).map(|v| &v.value)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn stats(&self) -> &DimensionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: i64, name: &str, created_at: i64) -> RoomEvent {
        RoomEvent {
            id,
            room_name: name.to_string(),
            created_at,
        }
    }

    fn player(id: i64, name: &str) -> PlayerEvent {
        PlayerEvent {
            player_id: id,
            player_name: name.to_string(),
            ip: "10.0.0.1".to_string(),
        }
    }

    #[test]
    fn lookup_of_unseen_key_is_none() {
        let store = DimensionStore::new();
        assert!(store.room(1).is_none());
        assert!(store.player(1).is_none());
    }

    #[test]
    fn last_writer_wins_by_event_time_not_arrival_order() {
        let mut store = DimensionStore::new();
        assert!(store.upsert_room(room(1, "newer", 10), 10));
        // Arrives second but is logically older: dropped.
        assert!(!store.upsert_room(room(1, "older", 5), 5));

        assert_eq!(store.room(1).unwrap().room_name, "newer");
        assert_eq!(store.stats().stale_drops, 1);
        assert_eq!(store.room_count(), 1);
    }

    #[test]
    fn equal_event_times_break_ties_by_arrival_order() {
        let mut store = DimensionStore::new();
        assert!(store.upsert_player(player(9, "first"), 100));
        assert!(store.upsert_player(player(9, "second"), 100));
        assert_eq!(store.player(9).unwrap().player_name, "second");
    }

    #[test]
    fn newer_event_time_overwrites() {
        let mut store = DimensionStore::new();
        store.upsert_room(room(1, "v1", 10), 10);
        store.upsert_room(room(1, "v2", 20), 20);
        assert_eq!(store.room(1).unwrap().room_name, "v2");
        assert_eq!(store.stats().rooms_applied, 2);
    }

    #[test]
    fn rooms_and_players_are_independent_keyspaces() {
        let mut store = DimensionStore::new();
        store.upsert_room(room(7, "arena", 10), 10);
        store.upsert_player(player(7, "Ann"), 10);
        assert_eq!(store.room_count(), 1);
        assert_eq!(store.player_count(), 1);
        assert_eq!(store.room(7).unwrap().room_name, "arena");
        assert_eq!(store.player(7).unwrap().player_name, "Ann");
    }
}
