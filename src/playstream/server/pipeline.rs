//! Pipeline coordinator.
//!
//! Wires the three source adapters, the enrichment task, and the sink task
//! together with bounded queues and owns the lifecycle:
//!
//! - one task per source: read, decode, forward (per-source backoff on
//!   transport loss; decode failures are skipped and counted)
//! - one enrichment task owning the watermark tracker, dimension store, and
//!   join operator - all mutable state is serialized through it
//! - one sink task batching writes with retry
//!
//! Shutdown (broadcast signal or all sources ending) cascades through the
//! channels: sources stop, the enrichment task drains its queue and
//! force-flushes pending activities, the sink flushes its final batch. No
//! buffered activity is silently lost.

use crate::playstream::datasource::{EventSink, EventSource, RetryPolicy, StreamDecoder};
use crate::playstream::enrich::{EnrichOperator, WatermarkTracker};
use crate::playstream::model::{EnrichedRecord, EventPayload, SourceEvent, StreamId};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, MissedTickBehavior};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::metrics::{MetricsSnapshot, PipelineMetrics};

/// A source adapter bound to one of the three streams, with its decoder.
pub struct SourceBinding {
    stream: StreamId,
    source: Box<dyn EventSource>,
    decoder: StreamDecoder,
}

impl SourceBinding {
    /// Bind a source with the stream's default decoder configuration.
    pub fn new(stream: StreamId, source: Box<dyn EventSource>) -> Self {
        Self {
            stream,
            source,
            decoder: StreamDecoder::for_stream(stream),
        }
    }

    /// Override the decoder (custom event-time field or format).
    pub fn with_decoder(mut self, decoder: StreamDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }
}

/// The streaming enrichment pipeline.
pub struct EnrichmentPipeline {
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
}

impl EnrichmentPipeline {
    /// Validate the configuration and create a pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    /// Shared handle to the live counters, for dashboards polling a running
    /// pipeline.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the pipeline to completion.
    ///
    /// Returns when every source has ended (or the shutdown signal fired)
    /// and all in-flight work has drained through the sink. The final
    /// metrics snapshot is the run summary.
    pub async fn run(
        self,
        sources: Vec<SourceBinding>,
        sink: Box<dyn EventSink>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<MetricsSnapshot, PipelineError> {
        validate_bindings(&sources)?;

        let (event_tx, event_rx) = mpsc::channel::<SourceEvent>(self.config.channel_capacity);
        let (record_tx, record_rx) = mpsc::channel::<EnrichedRecord>(self.config.channel_capacity);

        info!(
            "starting enrichment pipeline: lateness={:?}, channel_capacity={}, sink_batch={}",
            self.config.lateness, self.config.channel_capacity, self.config.sink_batch_size
        );

        let source_handles: Vec<_> = sources
            .into_iter()
            .map(|binding| {
                let tx = event_tx.clone();
                let metrics = Arc::clone(&self.metrics);
                let retry = self.config.retry.clone();
                let shutdown_rx = shutdown.resubscribe();
                tokio::spawn(run_source(binding, tx, metrics, retry, shutdown_rx))
            })
            .collect();
        // The enrichment task sees end-of-input once every source task has
        // dropped its sender clone.
        drop(event_tx);

        let enrich_handle = tokio::spawn(run_enrich(
            event_rx,
            record_tx,
            self.config.clone(),
            Arc::clone(&self.metrics),
        ));

        let sink_handle = tokio::spawn(run_sink(
            record_rx,
            sink,
            self.config.clone(),
            Arc::clone(&self.metrics),
        ));

        for handle in source_handles {
            handle
                .await
                .map_err(|e| PipelineError::terminated("source", e))?;
        }
        enrich_handle
            .await
            .map_err(|e| PipelineError::terminated("enrich", e))?;
        sink_handle
            .await
            .map_err(|e| PipelineError::terminated("sink", e))?;

        let snapshot = self.metrics.snapshot();
        info!(
            "pipeline finished: {} enriched ({} fast-path, {} buffered, {} null-filled), {} written",
            snapshot.total_enriched(),
            snapshot.enriched_fast_path,
            snapshot.enriched_buffered,
            snapshot.enriched_flushed,
            snapshot.records_written
        );
        Ok(snapshot)
    }
}

/// Each of the three streams must be bound exactly once.
fn validate_bindings(sources: &[SourceBinding]) -> Result<(), PipelineError> {
    for stream in StreamId::ALL {
        let count = sources.iter().filter(|b| b.stream == stream).count();
        if count != 1 {
            return Err(PipelineError::invalid_config(format!(
                "expected exactly one {} source binding, found {}",
                stream, count
            )));
        }
    }
    Ok(())
}

/// Source task: pull, decode, forward, with per-source backoff on transport
/// loss.
async fn run_source(
    mut binding: SourceBinding,
    tx: mpsc::Sender<SourceEvent>,
    metrics: Arc<PipelineMetrics>,
    retry: RetryPolicy,
    mut shutdown: broadcast::Receiver<()>,
) {
    let stream = binding.stream;
    let mut attempt: u32 = 0;

    loop {
        let next = tokio::select! {
            _ = shutdown.recv() => {
                info!("source {} stopping on shutdown signal", stream);
                break;
            }
            next = binding.source.next() => next,
        };

        match next {
            Ok(Some(raw)) => {
                attempt = 0;
                match binding.decoder.decode(&raw) {
                    Ok(event) => {
                        metrics.record_ingested(stream);
                        if tx.send(event).await.is_err() {
                            // Enrichment task is gone; nothing left to feed.
                            break;
                        }
                    }
                    Err(err) => {
                        metrics.record_decode_error(stream);
                        warn!("skipping malformed message: {}", err);
                    }
                }
            }
            Ok(None) => {
                info!("source {} reached end of stream", stream);
                break;
            }
            Err(err) if err.is_transient() => {
                let delay = retry.delay_for(attempt);
                attempt = attempt.saturating_add(1);
                metrics.record_source_retry(stream);
                warn!("source {} unavailable ({}); retrying in {:?}", stream, err, delay);
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!("source {} stopping on shutdown signal", stream);
                        break;
                    }
                    _ = sleep(delay) => {}
                }
            }
            Err(err) => {
                // Decode-level failures surfaced by the adapter itself:
                // same skip-and-count policy as decoder failures.
                metrics.record_decode_error(stream);
                warn!("skipping malformed message: {}", err);
            }
        }
    }
}

/// Enrichment task: the single thread of control for all mutable state.
async fn run_enrich(
    mut event_rx: mpsc::Receiver<SourceEvent>,
    record_tx: mpsc::Sender<EnrichedRecord>,
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
) {
    let mut tracker = WatermarkTracker::new(config.lateness_ms());
    let mut operator = EnrichOperator::new(config.lateness, config.max_pending);

    while let Some(event) = event_rx.recv().await {
        if !tracker.observe(event.stream, event.event_time) {
            metrics.record_late_event(event.stream);
            debug!(
                "late event on {} stream: event_time={} < watermark={}",
                event.stream,
                event.event_time,
                tracker.watermark(event.stream)
            );
        }

        let mut emitted = match event.payload {
            EventPayload::Room(room) => operator.apply_room(room, event.event_time),
            EventPayload::Player(player) => operator.apply_player(player, event.event_time),
            EventPayload::Activity(activity) => {
                operator.process_activity(activity, event.event_time)
            }
        };
        emitted.extend(operator.advance_watermark(tracker.combined_watermark()));

        metrics.apply_enrich_stats(operator.stats());
        metrics.apply_dimension_stats(operator.store().stats());

        for record in emitted {
            if record_tx.send(record).await.is_err() {
                return;
            }
        }
    }

    // All sources are done (end of stream or shutdown) and the queue is
    // drained; force-flush whatever is still waiting so nothing is lost.
    let drained = operator.force_flush();
    if !drained.is_empty() {
        info!(
            "force-flushed {} pending activities on shutdown",
            drained.len()
        );
    }
    metrics.apply_enrich_stats(operator.stats());
    for record in drained {
        if record_tx.send(record).await.is_err() {
            return;
        }
    }
}

/// Sink task: batch, flush on size or interval, retry transient failures.
async fn run_sink(
    mut record_rx: mpsc::Receiver<EnrichedRecord>,
    mut sink: Box<dyn EventSink>,
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
) {
    let mut batch: Vec<EnrichedRecord> = Vec::with_capacity(config.sink_batch_size);
    let mut ticker = tokio::time::interval(config.sink_flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = record_rx.recv() => match maybe {
                Some(record) => {
                    batch.push(record);
                    if batch.len() >= config.sink_batch_size {
                        write_with_retry(&mut sink, &mut batch, &config.retry, &metrics).await;
                    }
                }
                None => {
                    write_with_retry(&mut sink, &mut batch, &config.retry, &metrics).await;
                    if let Err(err) = sink.flush().await {
                        warn!("sink flush failed during shutdown: {}", err);
                    }
                    break;
                }
            },
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    write_with_retry(&mut sink, &mut batch, &config.retry, &metrics).await;
                }
            }
        }
    }
}

/// Write a batch, retrying transient failures indefinitely with backoff.
/// Permanent rejection drops the batch with a log line and a counter bump -
/// a bad record must not wedge the pipeline.
async fn write_with_retry(
    sink: &mut Box<dyn EventSink>,
    batch: &mut Vec<EnrichedRecord>,
    retry: &RetryPolicy,
    metrics: &PipelineMetrics,
) {
    if batch.is_empty() {
        return;
    }
    let records = std::mem::take(batch);
    let mut attempt: u32 = 0;

    loop {
        match sink.write_batch(records.clone()).await {
            Ok(()) => {
                metrics.record_written(records.len());
                return;
            }
            Err(err) if err.is_transient() => {
                let delay = retry.delay_for(attempt);
                attempt = attempt.saturating_add(1);
                metrics.record_sink_retry();
                warn!(
                    "sink unavailable ({}); retrying {} records in {:?}",
                    err,
                    records.len(),
                    delay
                );
                sleep(delay).await;
            }
            Err(err) => {
                metrics.record_sink_rejected(records.len());
                error!("sink rejected {} records: {}", records.len(), err);
                return;
            }
        }
    }
}
