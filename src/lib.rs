//! # playstream
//!
//! A watermark-driven streaming enrichment engine for gaming platform events.
//!
//! The engine consumes three independently-ordered event streams — room
//! creation, player registration, and player activity — and produces a single
//! enriched record stream suitable for indexing and dashboarding. Dimension
//! events (rooms, players) feed a keyed state store; activity events are
//! joined against that store with left-join semantics, buffering activities
//! whose dimensions have not yet arrived until either the dimension shows up
//! or the combined watermark passes the activity's lateness deadline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use playstream::playstream::datasource::{ChannelSink, ChannelSource};
//! use playstream::playstream::model::StreamId;
//! use playstream::playstream::server::{EnrichmentPipeline, PipelineConfig, SourceBinding};
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let pipeline = EnrichmentPipeline::new(config)?;
//!
//!     let (rooms_tx, rooms) = ChannelSource::pair(64);
//!     let (players_tx, players) = ChannelSource::pair(64);
//!     let (activity_tx, activity) = ChannelSource::pair(64);
//!     let (sink, _output_rx) = ChannelSink::pair(64);
//!
//!     let sources = vec![
//!         SourceBinding::new(StreamId::Rooms, Box::new(rooms)),
//!         SourceBinding::new(StreamId::Players, Box::new(players)),
//!         SourceBinding::new(StreamId::Activity, Box::new(activity)),
//!     ];
//!
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!     let summary = pipeline.run(sources, Box::new(sink), shutdown_rx).await?;
//!     println!("enriched {} records", summary.records_written);
//!     # let _ = (rooms_tx, players_tx, activity_tx, shutdown_tx);
//!     Ok(())
//! }
//! ```

pub mod playstream;

pub use playstream::datasource::{EventSink, EventSource, RawMessage, StreamDecoder};
pub use playstream::model::{
    ActivityEvent, Coordinates, EnrichedRecord, PlayerEvent, RoomEvent, StreamId,
};
pub use playstream::server::{EnrichmentPipeline, PipelineConfig, SourceBinding};
