//! Services - queue analytics pipeline
//!
//! - `zone_counter` - maps detections to zone counts
//! - `queue_store` - per-facility bounded queues and wait times
//! - `pressure` - pressure scores, priority queue and mitigation
//! - `alerts` - alert batches per facility
//! - `scoring` - optimization score and performance summary
//! - `advisor` - recommendations and flow optimizations
//! - `monitor` - entry point wiring the stages together

pub mod advisor;
pub mod alerts;
pub mod monitor;
pub mod pressure;
pub mod queue_store;
pub mod scoring;
pub mod zone_counter;

// Re-export commonly used types
pub use monitor::{MonitorSettings, QueueMonitor};
