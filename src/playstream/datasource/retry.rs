//! Exponential backoff policy for transient source and sink failures.
//!
//! The pipeline retries `Unavailable` errors indefinitely with a growing,
//! clamped delay; only the failing source (or the sink task) pauses, the rest
//! of the pipeline keeps running until the bounded queues fill and
//! backpressure it naturally.

use std::time::Duration;

/// Backoff schedule: `initial * multiplier^attempt`, clamped to `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Upper clamp on the delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            multiplier: 1.5,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(initial: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial,
            multiplier,
            max_delay,
        }
    }

    /// Fixed-interval schedule (multiplier 1.0).
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            multiplier: 1.0,
            max_delay: interval,
        }
    }

    /// Delay for the given zero-based attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// Policies must not shrink between attempts.
    pub fn is_valid(&self) -> bool {
        self.multiplier >= 1.0 && self.initial <= self.max_delay && self.initial > Duration::ZERO
    }
}
