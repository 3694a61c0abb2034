//! Queue status snapshot returned to callers

use crate::domain::types::{FacilityId, Tier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Occupancy per zone name, as produced by the zone counter
pub type ZoneCounts = BTreeMap<String, u32>;

/// Per-zone part of a status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneStatus {
    pub count: u32,
    /// Estimated wait in minutes
    pub wait_time: u32,
    pub status: Tier,
}

/// Point-in-time view of one facility's queues
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub facility_id: FacilityId,
    pub total_people: u32,
    pub crowd_level: Tier,
    /// Keyed by zone name, lexicographic order
    pub queues: BTreeMap<String, ZoneStatus>,
    pub recommendations: Vec<String>,
    pub last_update: DateTime<Utc>,
}

impl QueueStatus {
    /// Build a status from raw per-zone `(count, wait_time)` figures
    ///
    /// Tiers are derived here so every snapshot uses the same scales.
    pub fn from_counts(
        facility_id: FacilityId,
        total_people: u32,
        zones: impl IntoIterator<Item = (String, u32, u32)>,
        last_update: DateTime<Utc>,
    ) -> Self {
        let queues = zones
            .into_iter()
            .map(|(name, count, wait_time)| {
                (name, ZoneStatus { count, wait_time, status: Tier::for_zone(count) })
            })
            .collect();
        Self {
            facility_id,
            total_people,
            crowd_level: Tier::for_facility(total_people),
            queues,
            recommendations: Vec::new(),
            last_update,
        }
    }

    /// Count for a zone, 0 when the zone is not present
    pub fn count(&self, zone: &str) -> u32 {
        self.queues.get(zone).map_or(0, |z| z.count)
    }

    /// Wait time for a zone, 0 when the zone is not present
    pub fn wait_time(&self, zone: &str) -> u32 {
        self.queues.get(zone).map_or(0, |z| z.wait_time)
    }
}
