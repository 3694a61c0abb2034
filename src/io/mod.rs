//! IO modules - external system interfaces
//!
//! - `detector` - person detection over camera frames
//! - `api` - HTTP JSON API over the queue monitor
//! - `prometheus` - Prometheus text rendering of metrics

pub mod api;
pub mod detector;
pub mod prometheus;

// Re-export commonly used types
pub use api::{start_api_server, Api};
pub use detector::{BoxDetector, PersonDetector};
