//! The enrichment join operator.
//!
//! Converts activity events into enriched records by joining against the
//! dimension store with left-join semantics:
//!
//! 1. On arrival, both dimensions are looked up. Both present: emit
//!    immediately (fast path).
//! 2. Either absent: the activity is parked in a pending buffer indexed by
//!    `room_id`, by `player_id`, and by flush deadline
//!    (`event_time + lateness`).
//! 3. Every dimension upsert re-checks the waiters on that key and emits any
//!    activity that is now fully matched.
//! 4. When the combined watermark passes an activity's deadline, it is
//!    flushed with nulls for whatever is still missing. Flushing is
//!    terminal: the entry is removed and never re-enriched, even if the
//!    dimension arrives later.
//!
//! Each activity yields exactly one enriched record. The pending buffer is
//! bounded; at capacity the entry with the earliest deadline is force-flushed
//! first, keeping memory bounded even when the watermark stalls.
//!
//! All mutation runs on the pipeline's single enrichment task, so lookups
//! only ever see committed store state and upsert visibility is atomic per
//! key.

use crate::playstream::model::{ActivityEvent, EnrichedRecord, PlayerEvent, RoomEvent};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::state_store::DimensionStore;

/// An activity waiting for dimension data.
#[derive(Debug, Clone)]
struct PendingActivity {
    activity: ActivityEvent,
    /// Flush deadline: event_time + lateness
    deadline: i64,
}

/// Statistics for monitoring the join operator.
#[derive(Debug, Default, Clone)]
pub struct EnrichStats {
    /// Activity events processed
    pub activities_processed: u64,
    /// Enrichments emitted immediately on arrival
    pub fast_path_emits: u64,
    /// Enrichments emitted when a buffered activity's dimensions arrived
    pub buffered_emits: u64,
    /// Null-filled enrichments emitted on watermark flush or forced drain
    pub flushed_emits: u64,
    /// Pending entries force-flushed because the buffer hit capacity
    pub evictions: u64,
    /// Current pending-buffer occupancy
    pub pending_occupancy: usize,
    /// Peak pending-buffer occupancy
    pub pending_peak: usize,
}

impl EnrichStats {
    /// Total enriched records emitted.
    pub fn total_emits(&self) -> u64 {
        self.fast_path_emits + self.buffered_emits + self.flushed_emits
    }
}

/// Watermark-driven left-join operator over the dimension store.
#[derive(Debug)]
pub struct EnrichOperator {
    lateness_ms: i64,
    max_pending: usize,
    store: DimensionStore,

    /// Pending activities by insertion sequence
    pending: HashMap<u64, PendingActivity>,
    /// Waiting sequences by room key
    by_room: HashMap<i64, Vec<u64>>,
    /// Waiting sequences by player key
    by_player: HashMap<i64, Vec<u64>>,
    /// Waiting sequences by flush deadline, for ordered expiry
    by_deadline: BTreeMap<i64, Vec<u64>>,

    next_seq: u64,
    stats: EnrichStats,
}

impl EnrichOperator {
    /// Create an operator with the given lateness bound and pending-buffer
    /// capacity.
    pub fn new(lateness: Duration, max_pending: usize) -> Self {
        Self {
            lateness_ms: lateness.as_millis() as i64,
            max_pending,
            store: DimensionStore::new(),
            pending: HashMap::new(),
            by_room: HashMap::new(),
            by_player: HashMap::new(),
            by_deadline: BTreeMap::new(),
            next_seq: 0,
            stats: EnrichStats::default(),
        }
    }

    /// Upsert a room dimension and resolve any waiters on that key.
    pub fn apply_room(&mut self, room: RoomEvent, event_time: i64) -> Vec<EnrichedRecord> {
        let key = room.id;
        self.store.upsert_room(room, event_time);
        // Even a stale (dropped) update means the store has a value for this
        // key, so waiters are re-checked either way.
        self.resolve_waiters(self.by_room.get(&key).cloned().unwrap_or_default())
    }

    /// Upsert a player dimension and resolve any waiters on that key.
    pub fn apply_player(&mut self, player: PlayerEvent, event_time: i64) -> Vec<EnrichedRecord> {
        let key = player.player_id;
        self.store.upsert_player(player, event_time);
        self.resolve_waiters(self.by_player.get(&key).cloned().unwrap_or_default())
    }

    /// Process an activity event: fast-path emit or buffer.
    ///
    /// Returns the emitted records - the fast-path enrichment, and/or a
    /// null-filled record evicted to make room in a full buffer.
    pub fn process_activity(
        &mut self,
        activity: ActivityEvent,
        event_time: i64,
    ) -> Vec<EnrichedRecord> {
        self.stats.activities_processed += 1;

        let room = self.store.room(activity.room_id);
        let player = self.store.player(activity.player_id);
        if room.is_some() && player.is_some() {
            self.stats.fast_path_emits += 1;
            return vec![EnrichedRecord::from_parts(&activity, room, player)];
        }

        let mut emitted = Vec::new();
        if self.pending.len() >= self.max_pending {
            if let Some(record) = self.evict_oldest() {
                emitted.push(record);
            }
        }

        let deadline = event_time.saturating_add(self.lateness_ms);
        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_room.entry(activity.room_id).or_default().push(seq);
        self.by_player
            .entry(activity.player_id)
            .or_default()
            .push(seq);
        self.by_deadline.entry(deadline).or_default().push(seq);
        self.pending
            .insert(seq, PendingActivity { activity, deadline });

        self.stats.pending_occupancy = self.pending.len();
        self.stats.pending_peak = self.stats.pending_peak.max(self.pending.len());
        emitted
    }

    /// Flush every pending activity whose deadline the combined watermark has
    /// passed, null-filling dimensions that are still absent.
    ///
    /// The decision is terminal; flushed activities are never re-enriched.
    pub fn advance_watermark(&mut self, combined_watermark: i64) -> Vec<EnrichedRecord> {
        let mut emitted = Vec::new();
        loop {
            let Some((&deadline, _)) = self.by_deadline.first_key_value() else {
                break;
            };
            // "Passes" is strict: flush only once the watermark is beyond the
            // deadline.
            if combined_watermark <= deadline {
                break;
            }
            let seqs = self.by_deadline.remove(&deadline).unwrap_or_default();
            for seq in seqs {
                if let Some(entry) = self.remove_entry(seq, false) {
                    emitted.push(self.flush_record(&entry.activity));
                }
            }
        }
        self.stats.pending_occupancy = self.pending.len();
        emitted
    }

    /// Drain the entire pending buffer, null-filling missing dimensions.
    /// Used on shutdown so buffered activities are not silently lost.
    pub fn force_flush(&mut self) -> Vec<EnrichedRecord> {
        let mut emitted = Vec::new();
        let deadlines: Vec<i64> = self.by_deadline.keys().copied().collect();
        for deadline in deadlines {
            let seqs = self.by_deadline.remove(&deadline).unwrap_or_default();
            for seq in seqs {
                if let Some(entry) = self.remove_entry(seq, false) {
                    emitted.push(self.flush_record(&entry.activity));
                }
            }
        }
        self.stats.pending_occupancy = 0;
        emitted
    }

    /// Number of activities currently buffered.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &EnrichStats {
        &self.stats
    }

    pub fn store(&self) -> &DimensionStore {
        &self.store
    }

    /// Re-check the given waiters and emit those now fully matched.
    fn resolve_waiters(&mut self, seqs: Vec<u64>) -> Vec<EnrichedRecord> {
        let mut emitted = Vec::new();
        for seq in seqs {
            let Some(entry) = self.pending.get(&seq) else {
                continue;
            };
            let room = self.store.room(entry.activity.room_id);
            let player = self.store.player(entry.activity.player_id);
            if room.is_some() && player.is_some() {
                let record = EnrichedRecord::from_parts(&entry.activity, room, player);
                self.remove_entry(seq, true);
                self.stats.buffered_emits += 1;
                emitted.push(record);
            }
        }
        self.stats.pending_occupancy = self.pending.len();
        emitted
    }

    /// Force-flush the entry with the earliest deadline to free a slot.
    fn evict_oldest(&mut self) -> Option<EnrichedRecord> {
        let seq = *self.by_deadline.first_key_value()?.1.first()?;
        let entry = self.remove_entry(seq, true)?;
        self.stats.evictions += 1;
        log::warn!(
            "pending buffer full ({} entries); force-flushing activity for room {} / player {}",
            self.max_pending,
            entry.activity.room_id,
            entry.activity.player_id
        );
        Some(self.flush_record(&entry.activity))
    }

    /// Build the terminal record for a flushed activity from whatever the
    /// store knows right now.
    fn flush_record(&mut self, activity: &ActivityEvent) -> EnrichedRecord {
        self.stats.flushed_emits += 1;
        EnrichedRecord::from_parts(
            activity,
            self.store.room(activity.room_id),
            self.store.player(activity.player_id),
        )
    }

    /// Remove a pending entry from all indexes.
    ///
    /// `clean_deadline` is false when the caller is already consuming the
    /// deadline bucket.
    fn remove_entry(&mut self, seq: u64, clean_deadline: bool) -> Option<PendingActivity> {
        let entry = self.pending.remove(&seq)?;

        remove_from_bucket(&mut self.by_room, entry.activity.room_id, seq);
        remove_from_bucket(&mut self.by_player, entry.activity.player_id, seq);
        if clean_deadline {
            if let Some(bucket) = self.by_deadline.get_mut(&entry.deadline) {
                bucket.retain(|s| *s != seq);
                if bucket.is_empty() {
                    self.by_deadline.remove(&entry.deadline);
                }
            }
        }
        Some(entry)
    }
}

fn remove_from_bucket(index: &mut HashMap<i64, Vec<u64>>, key: i64, seq: u64) {
    if let Some(bucket) = index.get_mut(&key) {
        bucket.retain(|s| *s != seq);
        if bucket.is_empty() {
            index.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playstream::model::Coordinates;

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
            ip: "1.2.3.4".to_string(),
        }
    }

    fn activity(player_id: i64, room_id: i64, points: i32) -> ActivityEvent {
        ActivityEvent {
            player_id,
            room_id,
            points,
            coordinates: Coordinates { x: 1, y: 2 },
        }
    }

    fn operator(lateness_ms: u64) -> EnrichOperator {
        EnrichOperator::new(Duration::from_millis(lateness_ms), 1024)
    }

    #[test]
    fn fast_path_when_both_dimensions_present() {
        let mut op = operator(5_000);
        assert!(op.apply_room(room(1, "Classic", 100), 100).is_empty());
        assert!(op.apply_player(player(9, "Ann"), 100).is_empty());

        let out = op.process_activity(activity(9, 1, 50), 150);
        assert_eq!(out.len(), 1);
        let record = &out[0];
        assert_eq!(record.room_name.as_deref(), Some("Classic"));
        assert_eq!(record.room_created_at, Some(100));
        assert_eq!(record.player_name.as_deref(), Some("Ann"));
        assert_eq!(record.points, 50);
        assert_eq!(op.stats().fast_path_emits, 1);
        assert_eq!(op.pending_len(), 0);
    }

    #[test]
    fn buffered_activity_emits_when_dimensions_arrive() {
        let mut op = operator(5_000);
        assert!(op.process_activity(activity(9, 1, 50), 150).is_empty());
        assert_eq!(op.pending_len(), 1);

        // Room alone is not enough; player is still missing.
        assert!(op.apply_room(room(1, "Classic", 100), 100).is_empty());
        assert_eq!(op.pending_len(), 1);

        let out = op.apply_player(player(9, "Ann"), 120);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_fully_enriched());
        assert_eq!(op.stats().buffered_emits, 1);
        assert_eq!(op.pending_len(), 0);
    }

    #[test]
    fn watermark_flush_null_fills_missing_dimensions() {
        let mut op = operator(5_000);
        op.apply_player(player(9, "Ann"), 100);
        op.process_activity(activity(9, 2, 10), 150);

        // Deadline is 150 + 5000; a watermark at the deadline is not enough.
        assert!(op.advance_watermark(5_150).is_empty());

        let out = op.advance_watermark(5_151);
        assert_eq!(out.len(), 1);
        let record = &out[0];
        assert!(record.room_name.is_none());
        assert!(record.room_created_at.is_none());
        assert_eq!(record.player_name.as_deref(), Some("Ann"));
        assert_eq!(op.stats().flushed_emits, 1);
        assert_eq!(op.pending_len(), 0);
    }

    #[test]
    fn flush_is_terminal_even_if_dimension_arrives_later() {
        let mut op = operator(1_000);
        op.apply_player(player(9, "Ann"), 100);
        op.process_activity(activity(9, 2, 10), 150);

        let flushed = op.advance_watermark(2_000);
        assert_eq!(flushed.len(), 1);

        // The room shows up after the flush: no second emission.
        assert!(op.apply_room(room(2, "LateRoom", 90), 90).is_empty());
        assert!(op.advance_watermark(10_000).is_empty());
        assert_eq!(op.stats().total_emits(), 1);
    }

    #[test]
    fn exactly_one_record_per_activity() {
        let mut op = operator(1_000);
        op.process_activity(activity(9, 1, 10), 100);
        op.process_activity(activity(9, 1, 20), 110);

        // Both waiters complete on the same upsert pair.
        op.apply_room(room(1, "Classic", 50), 50);
        let out = op.apply_player(player(9, "Ann"), 60);
        assert_eq!(out.len(), 2);

        // Watermark passing their deadlines emits nothing further.
        assert!(op.advance_watermark(100_000).is_empty());
        assert_eq!(op.stats().total_emits(), 2);
    }

    #[test]
    fn flush_order_follows_deadlines() {
        let mut op = operator(0);
        op.process_activity(activity(1, 1, 1), 300);
        op.process_activity(activity(2, 2, 2), 100);
        op.process_activity(activity(3, 3, 3), 200);

        let out = op.advance_watermark(250);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].player_id, 2);
        assert_eq!(out[1].player_id, 3);
        assert_eq!(op.pending_len(), 1);
    }

    #[test]
    fn capacity_eviction_flushes_earliest_deadline_first() {
        let mut op = EnrichOperator::new(Duration::from_millis(0), 2);
        op.process_activity(activity(1, 1, 1), 100);
        op.process_activity(activity(2, 2, 2), 200);

        let out = op.process_activity(activity(3, 3, 3), 300);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].player_id, 1);
        assert_eq!(op.stats().evictions, 1);
        assert_eq!(op.pending_len(), 2);
    }

    #[test]
    fn force_flush_drains_everything_with_known_dimensions() {
        let mut op = operator(60_000);
        op.apply_room(room(1, "Classic", 100), 100);
        op.process_activity(activity(9, 1, 10), 150); // player missing
        op.process_activity(activity(8, 2, 20), 160); // both missing

        let out = op.force_flush();
        assert_eq!(out.len(), 2);
        assert_eq!(op.pending_len(), 0);

        let for_room_1 = out.iter().find(|r| r.room_id == 1).unwrap();
        assert_eq!(for_room_1.room_name.as_deref(), Some("Classic"));
        assert!(for_room_1.player_name.is_none());

        let for_room_2 = out.iter().find(|r| r.room_id == 2).unwrap();
        assert!(for_room_2.room_name.is_none());
    }

    #[test]
    fn waiter_resolution_uses_retained_dimension_value() {
        let mut op = operator(5_000);
        op.apply_room(room(1, "Current", 200), 200);
        // Buffered: room 1 is known but player 9 is not.
        op.process_activity(activity(9, 1, 10), 150);

        // A stale room update arrives and is dropped; the waiter stays put.
        assert!(op.apply_room(room(1, "Stale", 50), 50).is_empty());
        assert_eq!(op.pending_len(), 1);

        // When the player completes the match, the retained value is used.
        let out = op.apply_player(player(9, "Ann"), 100);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].room_name.as_deref(), Some("Current"));
    }

    #[test]
    fn pending_occupancy_tracks_buffer_size() {
        let mut op = operator(1_000);
        op.process_activity(activity(1, 1, 1), 100);
        op.process_activity(activity(2, 2, 2), 110);
        assert_eq!(op.stats().pending_occupancy, 2);
        assert_eq!(op.stats().pending_peak, 2);

        op.advance_watermark(10_000);
        assert_eq!(op.stats().pending_occupancy, 0);
        assert_eq!(op.stats().pending_peak, 2);
    }
}
