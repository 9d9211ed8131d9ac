//! Top-level module for the playstream enrichment engine.
//!
//! - [`model`] - typed events and the enriched output record
//! - [`datasource`] - source/sink abstractions, decoding, retry policy
//! - [`enrich`] - watermark tracking, dimension state, the join operator
//! - [`server`] - pipeline coordinator, configuration, metrics, shutdown

pub mod datasource;
pub mod enrich;
pub mod model;
pub mod server;
