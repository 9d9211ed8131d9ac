//! Pipeline coordination: configuration, metrics, lifecycle, shutdown.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod shutdown;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{EnrichmentPipeline, SourceBinding};
pub use shutdown::{shutdown_signal, ShutdownSignal};
