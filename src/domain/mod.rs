//! Domain models - core types shared by the queue pipeline
//!
//! - `types` - identifiers, geometry, tiers and detection frames
//! - `zone` - ordered zone layouts
//! - `status` - queue status snapshots

pub mod status;
pub mod types;
pub mod zone;

pub use status::{QueueStatus, ZoneCounts, ZoneStatus};
pub use types::{FacilityId, Point, Rect, Tier};
pub use zone::{Zone, ZoneLayout};
