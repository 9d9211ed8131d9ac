//! Event-time extraction from decoded payloads.
//!
//! Watermarks and join lateness decisions run on event time, not arrival
//! time. Each stream is configured with an [`EventTimeSpec`] naming the
//! payload field that carries the logical timestamp and the format it is in.
//! Streams without a usable timestamp field fall back to arrival
//! (processing) time at the decode boundary.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Supported timestamp encodings for event-time fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Unix epoch milliseconds (e.g. 1696723200000)
    EpochMillis,
    /// Unix epoch seconds (e.g. 1696723200)
    EpochSeconds,
    /// ISO 8601 / RFC 3339 string (e.g. "2023-10-08T00:00:00Z")
    Iso8601,
}

impl TimestampFormat {
    /// Parse a format name as it appears in configuration.
    pub fn parse(s: &str) -> Result<Self, EventTimeError> {
        match s {
            "epoch_millis" => Ok(TimestampFormat::EpochMillis),
            "epoch_seconds" | "epoch" => Ok(TimestampFormat::EpochSeconds),
            "iso8601" | "ISO8601" => Ok(TimestampFormat::Iso8601),
            other => Err(EventTimeError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors raised during event-time extraction.
#[derive(Debug, Error)]
pub enum EventTimeError {
    #[error("unknown timestamp format '{0}'")]
    UnknownFormat(String),

    #[error("event-time field '{field}' is missing")]
    MissingField { field: String },

    #[error("event-time field '{field}' has unparseable value '{value}'")]
    BadValue { field: String, value: String },
}

/// Names the payload field carrying the event time and its format.
#[derive(Debug, Clone)]
pub struct EventTimeSpec {
    /// Field to read from the decoded JSON payload
    pub field: String,
    /// Timestamp format of that field
    pub format: TimestampFormat,
}

impl EventTimeSpec {
    pub fn new(field: impl Into<String>, format: TimestampFormat) -> Self {
        Self {
            field: field.into(),
            format,
        }
    }

    /// Epoch-millis field, the common case.
    pub fn epoch_millis(field: impl Into<String>) -> Self {
        Self::new(field, TimestampFormat::EpochMillis)
    }

    /// Extract the event time from a decoded JSON payload.
    pub fn extract(&self, payload: &Value) -> Result<i64, EventTimeError> {
        let value = payload
            .get(&self.field)
            .ok_or_else(|| EventTimeError::MissingField {
                field: self.field.clone(),
            })?;

        match self.format {
            TimestampFormat::EpochMillis => value_as_i64(value).ok_or_else(|| self.bad(value)),
            TimestampFormat::EpochSeconds => value_as_i64(value)
                .and_then(|secs| secs.checked_mul(1000))
                .ok_or_else(|| self.bad(value)),
            TimestampFormat::Iso8601 => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.timestamp_millis())
                .ok_or_else(|| self.bad(value)),
        }
    }

    fn bad(&self, value: &Value) -> EventTimeError {
        EventTimeError::BadValue {
            field: self.field.clone(),
            value: value.to_string(),
        }
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        // Some producers quote numeric timestamps
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

/// Arrival-time fallback for streams with no configured event-time field.
pub fn processing_time() -> i64 {
    Utc::now().timestamp_millis()
}
