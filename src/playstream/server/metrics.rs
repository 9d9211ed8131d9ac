//! Pipeline observability counters.
//!
//! The counters the surrounding dashboard system needs: late events, buffer
//! occupancy, fast-path vs buffered vs null-filled enrichments, and
//! sink health. Shared across tasks as `Arc<PipelineMetrics>`; `snapshot()`
//! produces a plain struct for export.

use crate::playstream::enrich::{DimensionStats, EnrichStats};
use crate::playstream::model::StreamId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated by the pipeline tasks.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    events_ingested: [AtomicU64; 3],
    decode_errors: [AtomicU64; 3],
    late_events: [AtomicU64; 3],
    source_retries: [AtomicU64; 3],

    enriched_fast_path: AtomicU64,
    enriched_buffered: AtomicU64,
    enriched_flushed: AtomicU64,
    pending_occupancy: AtomicU64,
    pending_peak: AtomicU64,
    pending_evictions: AtomicU64,
    stale_dimension_drops: AtomicU64,

    sink_retries: AtomicU64,
    sink_rejected_records: AtomicU64,
    records_written: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingested(&self, stream: StreamId) {
        self.events_ingested[stream.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_decode_error(&self, stream: StreamId) {
        self.decode_errors[stream.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_late_event(&self, stream: StreamId) {
        self.late_events[stream.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_source_retry(&self, stream: StreamId) {
        self.source_retries[stream.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_sink_retry(&self) {
        self.sink_retries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_sink_rejected(&self, records: usize) {
        self.sink_rejected_records
            .fetch_add(records as u64, Ordering::SeqCst);
    }

    pub fn record_written(&self, records: usize) {
        self.records_written
            .fetch_add(records as u64, Ordering::SeqCst);
    }

    /// Mirror the enrichment operator's own stats into the shared counters.
    pub fn apply_enrich_stats(&self, stats: &EnrichStats) {
        self.enriched_fast_path
            .store(stats.fast_path_emits, Ordering::SeqCst);
        self.enriched_buffered
            .store(stats.buffered_emits, Ordering::SeqCst);
        self.enriched_flushed
            .store(stats.flushed_emits, Ordering::SeqCst);
        self.pending_occupancy
            .store(stats.pending_occupancy as u64, Ordering::SeqCst);
        self.pending_peak
            .store(stats.pending_peak as u64, Ordering::SeqCst);
        self.pending_evictions
            .store(stats.evictions, Ordering::SeqCst);
    }

    /// Mirror the dimension store's stats into the shared counters.
    pub fn apply_dimension_stats(&self, stats: &DimensionStats) {
        self.stale_dimension_drops
            .store(stats.stale_drops, Ordering::SeqCst);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load3 = |a: &[AtomicU64; 3]| {
            [
                a[0].load(Ordering::SeqCst),
                a[1].load(Ordering::SeqCst),
                a[2].load(Ordering::SeqCst),
            ]
        };
        MetricsSnapshot {
            events_ingested: load3(&self.events_ingested),
            decode_errors: load3(&self.decode_errors),
            late_events: load3(&self.late_events),
            source_retries: load3(&self.source_retries),
            enriched_fast_path: self.enriched_fast_path.load(Ordering::SeqCst),
            enriched_buffered: self.enriched_buffered.load(Ordering::SeqCst),
            enriched_flushed: self.enriched_flushed.load(Ordering::SeqCst),
            pending_occupancy: self.pending_occupancy.load(Ordering::SeqCst),
            pending_peak: self.pending_peak.load(Ordering::SeqCst),
            pending_evictions: self.pending_evictions.load(Ordering::SeqCst),
            stale_dimension_drops: self.stale_dimension_drops.load(Ordering::SeqCst),
            sink_retries: self.sink_retries.load(Ordering::SeqCst),
            sink_rejected_records: self.sink_rejected_records.load(Ordering::SeqCst),
            records_written: self.records_written.load(Ordering::SeqCst),
        }
    }
}

/// Exported counter values; per-stream arrays are indexed by
/// [`StreamId::index`] (rooms, players, activity).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub events_ingested: [u64; 3],
    pub decode_errors: [u64; 3],
    pub late_events: [u64; 3],
    pub source_retries: [u64; 3],
    pub enriched_fast_path: u64,
    pub enriched_buffered: u64,
    pub enriched_flushed: u64,
    pub pending_occupancy: u64,
    pub pending_peak: u64,
    pub pending_evictions: u64,
    pub stale_dimension_drops: u64,
    pub sink_retries: u64,
    pub sink_rejected_records: u64,
    pub records_written: u64,
}

impl MetricsSnapshot {
    /// Total enrichments emitted across all paths.
    pub fn total_enriched(&self) -> u64 {
        self.enriched_fast_path + self.enriched_buffered + self.enriched_flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_stream_counters_are_independent() {
        let metrics = PipelineMetrics::new();
        metrics.record_ingested(StreamId::Rooms);
        metrics.record_ingested(StreamId::Rooms);
        metrics.record_ingested(StreamId::Activity);
        metrics.record_late_event(StreamId::Players);

        let snap = metrics.snapshot();
        assert_eq!(snap.events_ingested, [2, 0, 1]);
        assert_eq!(snap.late_events, [0, 1, 0]);
    }

    #[test]
    fn enrich_stats_are_mirrored_not_accumulated() {
        let metrics = PipelineMetrics::new();
        let stats = EnrichStats {
            fast_path_emits: 5,
            buffered_emits: 2,
            flushed_emits: 1,
            pending_occupancy: 3,
            ..Default::default()
        };
        metrics.apply_enrich_stats(&stats);
        metrics.apply_enrich_stats(&stats);

        let snap = metrics.snapshot();
        assert_eq!(snap.enriched_fast_path, 5);
        assert_eq!(snap.total_enriched(), 8);
        assert_eq!(snap.pending_occupancy, 3);
    }
}
