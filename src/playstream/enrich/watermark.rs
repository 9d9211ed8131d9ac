//! Per-source watermark tracking.
//!
//! Each source's watermark is `max(observed event time) - allowed lateness`:
//! the point below which no further events are expected from that source.
//! The combined watermark is the minimum across all three sources and is the
//! only safe trigger for terminal decisions (null-filled flushes).
//!
//! Policy: an event arriving below its source watermark is "late" - it is
//! flagged for metrics but still fully processed, since enrichment here
//! favors completeness over strict ordering.

use crate::playstream::model::StreamId;

/// Progress state for a single source.
#[derive(Debug, Clone, Copy)]
struct SourceProgress {
    /// Highest event time observed so far
    last_event_time: i64,
    /// Current watermark; never decreases
    watermark: i64,
}

impl SourceProgress {
    fn idle() -> Self {
        // i64::MIN means "nothing observed yet"; the combined watermark stays
        // pinned there until every source has produced at least one event.
        Self {
            last_event_time: i64::MIN,
            watermark: i64::MIN,
        }
    }
}

/// Snapshot of watermark state for the observability surface.
#[derive(Debug, Clone, Default)]
pub struct WatermarkStats {
    pub watermarks: [i64; 3],
    pub last_event_times: [i64; 3],
    pub late_events: [u64; 3],
    pub combined_watermark: i64,
}

/// Tracks watermarks for the three input streams.
#[derive(Debug)]
pub struct WatermarkTracker {
    lateness_ms: i64,
    sources: [SourceProgress; 3],
    late_events: [u64; 3],
}

impl WatermarkTracker {
    /// Create a tracker with the given allowed lateness in milliseconds.
    pub fn new(lateness_ms: i64) -> Self {
        Self {
            lateness_ms,
            sources: [SourceProgress::idle(); 3],
            late_events: [0; 3],
        }
    }

    /// Observe an event time from a source, advancing its watermark.
    ///
    /// Returns `true` when the event is on time, `false` when it arrived
    /// below the source's watermark. Late events are counted but the caller
    /// still processes them.
    pub fn observe(&mut self, stream: StreamId, event_time: i64) -> bool {
        let idx = stream.index();
        let source = &mut self.sources[idx];

        if event_time > source.last_event_time {
            source.last_event_time = event_time;
            // last_event_time only grows, so the watermark is monotonic too.
            source.watermark = event_time.saturating_sub(self.lateness_ms);
        }

        let on_time = event_time >= source.watermark;
        if !on_time {
            self.late_events[idx] += 1;
        }
        on_time
    }

    /// Watermark of a single source.
    pub fn watermark(&self, stream: StreamId) -> i64 {
        self.sources[stream.index()].watermark
    }

    /// The global progress point: minimum watermark across all sources.
    ///
    /// Stays at `i64::MIN` until every source has been observed at least
    /// once, so nothing is flushed while a source has produced no data.
    pub fn combined_watermark(&self) -> i64 {
        self.sources[0]
            .watermark
            .min(self.sources[1].watermark)
            .min(self.sources[2].watermark)
    }

    /// Highest event time observed from a source.
    pub fn last_event_time(&self, stream: StreamId) -> i64 {
        self.sources[stream.index()].last_event_time
    }

    /// Late-event count for a source.
    pub fn late_events(&self, stream: StreamId) -> u64 {
        self.late_events[stream.index()]
    }

    pub fn stats(&self) -> WatermarkStats {
        WatermarkStats {
            watermarks: [
                self.sources[0].watermark,
                self.sources[1].watermark,
                self.sources[2].watermark,
            ],
            last_event_times: [
                self.sources[0].last_event_time,
                self.sources[1].last_event_time,
                self.sources[2].last_event_time,
            ],
            late_events: self.late_events,
            combined_watermark: self.combined_watermark(),
        }
    }
}
