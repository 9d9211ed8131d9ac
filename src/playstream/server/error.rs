//! Pipeline-level error type.
//!
//! Steady-state source/sink errors are handled inside their tasks (skip,
//! retry, drop) and never surface here; [`PipelineError`] covers the fatal
//! conditions that terminate `run()` with a diagnostic.

use crate::playstream::datasource::{SinkError, SourceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Startup validation failed; the pipeline never ran.
    #[error("invalid pipeline configuration: {message}")]
    InvalidConfig { message: String },

    /// A pipeline task panicked or was aborted.
    #[error("{task} task terminated abnormally: {message}")]
    Terminated { task: &'static str, message: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn terminated(task: &'static str, message: impl ToString) -> Self {
        PipelineError::Terminated {
            task,
            message: message.to_string(),
        }
    }
}
