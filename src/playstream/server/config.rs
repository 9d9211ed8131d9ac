//! Pipeline configuration.
//!
//! Consumed at startup; invalid configuration is fatal with a clear
//! diagnostic rather than a degraded run.

use crate::playstream::datasource::RetryPolicy;
use std::time::Duration;

use super::error::PipelineError;

/// Configuration for an enrichment pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Allowed lateness: how long the engine waits for out-of-order data
    /// before a buffered activity's enrichment becomes terminal.
    pub lateness: Duration,

    /// Capacity of the bounded queues between tasks. A full queue suspends
    /// the producing side, which is the pipeline's backpressure mechanism.
    pub channel_capacity: usize,

    /// Maximum buffered activities awaiting dimension data. At capacity the
    /// oldest entry is force-flushed (null-filled) to keep memory bounded.
    pub max_pending: usize,

    /// Sink writes are batched up to this many records.
    pub sink_batch_size: usize,

    /// A partial batch is flushed after this interval regardless of size.
    pub sink_flush_interval: Duration,

    /// Backoff schedule for transient source/sink failures.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lateness: Duration::from_secs(5),
            channel_capacity: 1024,
            max_pending: 100_000,
            sink_batch_size: 100,
            sink_flush_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_lateness(mut self, lateness: Duration) -> Self {
        self.lateness = lateness;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn with_sink_batching(mut self, batch_size: usize, flush_interval: Duration) -> Self {
        self.sink_batch_size = batch_size;
        self.sink_flush_interval = flush_interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Lateness bound in milliseconds.
    pub fn lateness_ms(&self) -> i64 {
        self.lateness.as_millis() as i64
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.channel_capacity == 0 {
            return Err(PipelineError::invalid_config("channel_capacity must be > 0"));
        }
        if self.max_pending == 0 {
            return Err(PipelineError::invalid_config("max_pending must be > 0"));
        }
        if self.sink_batch_size == 0 {
            return Err(PipelineError::invalid_config("sink_batch_size must be > 0"));
        }
        if self.sink_flush_interval.is_zero() {
            return Err(PipelineError::invalid_config(
                "sink_flush_interval must be > 0",
            ));
        }
        if self.lateness.as_millis() > i64::MAX as u128 {
            return Err(PipelineError::invalid_config("lateness exceeds i64 millis"));
        }
        if !self.retry.is_valid() {
            return Err(PipelineError::invalid_config(
                "retry policy must have multiplier >= 1.0 and 0 < initial <= max_delay",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = PipelineConfig::default().with_channel_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = PipelineConfig::default().with_sink_batching(0, Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn shrinking_retry_policy_is_rejected() {
        let config = PipelineConfig::default().with_retry(RetryPolicy::new(
            Duration::from_secs(10),
            0.5,
            Duration::from_secs(1),
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn builders_compose() {
        let config = PipelineConfig::default()
            .with_lateness(Duration::from_millis(250))
            .with_max_pending(16)
            .with_sink_batching(8, Duration::from_millis(50));
        assert_eq!(config.lateness_ms(), 250);
        assert_eq!(config.max_pending, 16);
        assert_eq!(config.sink_batch_size, 8);
        assert!(config.validate().is_ok());
    }
}
