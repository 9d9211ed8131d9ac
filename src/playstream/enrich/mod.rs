//! The enrichment core: watermark tracking, dimension state, and the
//! left-join operator that turns activity events into enriched records.

pub mod operator;
pub mod state_store;
pub mod watermark;

pub use operator::{EnrichOperator, EnrichStats};
pub use state_store::{DimensionStats, DimensionStore};
pub use watermark::{WatermarkStats, WatermarkTracker};
