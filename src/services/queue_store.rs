//! In-memory queue state per facility
//!
//! Holds, per facility, the zone layout and one bounded occupant queue per
//! zone. Wait times are always derived from queue length, never set
//! directly. State lives for the process lifetime; nothing is persisted.
//!
//! Key behaviors:
//! - `initialize` always discards prior state for the facility
//! - `ingest` truncates each zone at `max_queue_length` (lossy by design)
//! - `total_people` is the untruncated sum of the ingested counts
//! - unknown facilities read as `None`

use crate::domain::status::{QueueStatus, ZoneCounts};
use crate::domain::types::FacilityId;
use crate::domain::zone::ZoneLayout;
use crate::services::advisor;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info};

/// Queue sizing and service-rate settings
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    /// Occupants kept per zone; anything beyond is dropped
    pub max_queue_length: usize,
    /// Default service time per occupant (minutes)
    pub minutes_per_person: u32,
    /// Per-zone service time overrides (minutes)
    pub zone_minutes: HashMap<String, u32>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { max_queue_length: 50, minutes_per_person: 2, zone_minutes: HashMap::new() }
    }
}

impl QueueSettings {
    #[inline]
    pub fn minutes_for(&self, zone: &str) -> u32 {
        self.zone_minutes.get(zone).copied().unwrap_or(self.minutes_per_person)
    }
}

/// Bounded occupant queue for one zone
#[derive(Debug, Clone, Default)]
struct ZoneQueue {
    occupants: VecDeque<u32>,
    wait_minutes: u32,
}

impl ZoneQueue {
    fn filled(count: u32, cap: usize) -> Self {
        let len = (count as usize).min(cap);
        Self { occupants: (0..len as u32).collect(), wait_minutes: 0 }
    }

    #[inline]
    fn len(&self) -> u32 {
        self.occupants.len() as u32
    }
}

/// Queue state for a single facility
#[derive(Debug, Clone)]
struct FacilityQueueState {
    layout: ZoneLayout,
    queues: BTreeMap<String, ZoneQueue>,
    total_people: u32,
    last_update: DateTime<Utc>,
}

impl FacilityQueueState {
    fn empty(layout: ZoneLayout, now: DateTime<Utc>) -> Self {
        let queues = layout.names().map(|n| (n.to_string(), ZoneQueue::default())).collect();
        Self { layout, queues, total_people: 0, last_update: now }
    }

    fn refresh_wait_times(&mut self, settings: &QueueSettings) {
        for (name, queue) in self.queues.iter_mut() {
            queue.wait_minutes = queue.len().saturating_mul(settings.minutes_for(name));
        }
    }
}

/// Store of queue state keyed by facility
pub struct QueueStateStore {
    facilities: FxHashMap<FacilityId, FacilityQueueState>,
    settings: QueueSettings,
}

impl QueueStateStore {
    pub fn new(settings: QueueSettings) -> Self {
        Self { facilities: FxHashMap::default(), settings }
    }

    /// Reset a facility to empty queues for the given layout
    pub fn initialize(&mut self, facility: FacilityId, layout: ZoneLayout) {
        self.initialize_at(facility, layout, Utc::now());
    }

    pub fn initialize_at(&mut self, facility: FacilityId, layout: ZoneLayout, now: DateTime<Utc>) {
        info!(
            facility = %facility,
            zones = ?layout.names().collect::<Vec<_>>(),
            "zones_initialized"
        );
        self.facilities.insert(facility, FacilityQueueState::empty(layout, now));
    }

    pub fn contains(&self, facility: FacilityId) -> bool {
        self.facilities.contains_key(&facility)
    }

    pub fn layout(&self, facility: FacilityId) -> Option<&ZoneLayout> {
        self.facilities.get(&facility).map(|s| &s.layout)
    }

    pub fn facility_count(&self) -> usize {
        self.facilities.len()
    }

    /// Replace per-zone occupancy with freshly counted figures
    pub fn ingest(&mut self, facility: FacilityId, counts: &ZoneCounts) -> QueueStatus {
        self.ingest_at(facility, counts, Utc::now())
    }

    /// Unknown facilities are created with an empty layout first.
    ///
    /// Every layout zone and every counted zone ends up with a queue; layout
    /// zones missing from `counts` are emptied.
    pub fn ingest_at(
        &mut self,
        facility: FacilityId,
        counts: &ZoneCounts,
        now: DateTime<Utc>,
    ) -> QueueStatus {
        if !self.contains(facility) {
            debug!(facility = %facility, "ingest_unknown_facility_initializing");
        }
        let cap = self.settings.max_queue_length;
        let state = self
            .facilities
            .entry(facility)
            .or_insert_with(|| FacilityQueueState::empty(ZoneLayout::new(), now));

        let mut queues: BTreeMap<String, ZoneQueue> =
            state.layout.names().map(|n| (n.to_string(), ZoneQueue::default())).collect();
        let mut truncated = 0u32;
        for (zone, &count) in counts {
            let queue = ZoneQueue::filled(count, cap);
            truncated = truncated.saturating_add(count - queue.len());
            queues.insert(zone.clone(), queue);
        }

        state.queues = queues;
        state.total_people = counts.values().fold(0u32, |acc, &c| acc.saturating_add(c));
        state.refresh_wait_times(&self.settings);
        state.last_update = now;

        debug!(
            facility = %facility,
            total_people = %state.total_people,
            truncated = %truncated,
            "queues_updated"
        );

        Self::snapshot(facility, state)
    }

    /// Snapshot of a facility's queues, `None` when unknown
    pub fn status(&self, facility: FacilityId) -> Option<QueueStatus> {
        self.facilities.get(&facility).map(|state| Self::snapshot(facility, state))
    }

    fn snapshot(facility: FacilityId, state: &FacilityQueueState) -> QueueStatus {
        let mut status = QueueStatus::from_counts(
            facility,
            state.total_people,
            state.queues.iter().map(|(name, q)| (name.clone(), q.len(), q.wait_minutes)),
            state.last_update,
        );
        status.recommendations = advisor::recommendations(&status);
        status
    }

    /// Release half of every zone queue
    ///
    /// Returns the number of occupants released, `None` for an unknown facility.
    pub fn release_half(&mut self, facility: FacilityId) -> Option<u32> {
        let state = self.facilities.get_mut(&facility)?;
        let mut released = 0u32;
        for queue in state.queues.values_mut() {
            let keep = queue.occupants.len() / 2;
            released += (queue.occupants.len() - keep) as u32;
            queue.occupants.truncate(keep);
        }
        state.total_people = state.total_people.saturating_sub(released);
        state.refresh_wait_times(&self.settings);

        info!(facility = %facility, released = %released, "queues_released");
        Some(released)
    }

    /// Remove up to `max` of the oldest occupants from one zone
    ///
    /// Returns how many were removed (0 when the zone does not exist).
    pub fn reduce_zone(&mut self, facility: FacilityId, zone: &str, max: u32) -> Option<u32> {
        let state = self.facilities.get_mut(&facility)?;
        let Some(queue) = state.queues.get_mut(zone) else {
            return Some(0);
        };
        let removed = queue.len().min(max);
        queue.occupants.drain(..removed as usize);
        state.total_people = state.total_people.saturating_sub(removed);
        state.refresh_wait_times(&self.settings);

        debug!(facility = %facility, zone = %zone, removed = %removed, "zone_reduced");
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Rect, Tier};
    use chrono::Duration;

    fn create_store() -> QueueStateStore {
        QueueStateStore::new(QueueSettings::default())
    }

    fn layout() -> ZoneLayout {
        ZoneLayout::new()
            .with_zone("entry", [Rect::new(0, 0, 10, 10)])
            .with_zone("darshan", [Rect::new(11, 0, 20, 10)])
    }

    fn counts(pairs: &[(&str, u32)]) -> ZoneCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_initialize_creates_empty_queues() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());

        let status = store.status(FacilityId(1)).unwrap();
        assert_eq!(status.total_people, 0);
        assert_eq!(status.queues.len(), 2);
        assert!(status.queues.values().all(|z| z.count == 0 && z.wait_time == 0));
    }

    #[test]
    fn test_initialize_discards_prior_state() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        store.ingest(FacilityId(1), &counts(&[("entry", 12)]));
        store.initialize(FacilityId(1), layout());

        let status = store.status(FacilityId(1)).unwrap();
        assert_eq!(status.total_people, 0);
        assert_eq!(status.count("entry"), 0);
    }

    #[test]
    fn test_unknown_facility_status_is_none() {
        let store = create_store();
        assert!(store.status(FacilityId(99)).is_none());
    }

    #[test]
    fn test_ingest_computes_wait_times() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        let status = store.ingest(FacilityId(1), &counts(&[("entry", 7), ("darshan", 3)]));

        assert_eq!(status.total_people, 10);
        assert_eq!(status.queues["entry"].wait_time, 14);
        assert_eq!(status.queues["darshan"].wait_time, 6);
    }

    #[test]
    fn test_ingest_truncates_at_cap() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        let status = store.ingest(FacilityId(1), &counts(&[("entry", 60)]));

        assert_eq!(status.queues["entry"].count, 50);
        assert_eq!(status.queues["entry"].wait_time, 100);
        // total keeps the raw count
        assert_eq!(status.total_people, 60);
    }

    #[test]
    fn test_ingest_saturates_on_huge_counts() {
        let mut store = create_store();
        let status = store.ingest(FacilityId(1), &counts(&[("a", u32::MAX), ("b", u32::MAX)]));

        assert_eq!(status.count("a"), 50);
        assert_eq!(status.count("b"), 50);
        assert_eq!(status.total_people, u32::MAX);
    }

    #[test]
    fn test_ingest_empties_layout_zones_missing_from_counts() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        store.ingest(FacilityId(1), &counts(&[("entry", 5), ("darshan", 5)]));
        let status = store.ingest(FacilityId(1), &counts(&[("entry", 2)]));

        assert_eq!(status.count("darshan"), 0);
        assert_eq!(status.total_people, 2);
    }

    #[test]
    fn test_ingest_unknown_facility_initializes() {
        let mut store = create_store();
        let status = store.ingest(FacilityId(5), &counts(&[("prasad", 4)]));
        assert_eq!(status.count("prasad"), 4);
        assert!(store.layout(FacilityId(5)).unwrap().is_empty());
    }

    #[test]
    fn test_ingest_replay_is_idempotent() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        let c = counts(&[("entry", 9), ("darshan", 30)]);
        let t0 = Utc::now();
        let first = store.ingest_at(FacilityId(1), &c, t0);
        let second = store.ingest_at(FacilityId(1), &c, t0 + Duration::seconds(1));

        assert_eq!(first.total_people, second.total_people);
        assert_eq!(first.queues, second.queues);
        assert!(second.last_update > first.last_update);
    }

    #[test]
    fn test_zone_minutes_override() {
        let mut settings = QueueSettings::default();
        settings.zone_minutes.insert("darshan".to_string(), 5);
        let mut store = QueueStateStore::new(settings);
        store.initialize(FacilityId(1), layout());
        let status = store.ingest(FacilityId(1), &counts(&[("entry", 2), ("darshan", 2)]));

        assert_eq!(status.wait_time("entry"), 4);
        assert_eq!(status.wait_time("darshan"), 10);
    }

    #[test]
    fn test_status_tiers() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        let status = store.ingest(FacilityId(1), &counts(&[("entry", 45)]));
        assert_eq!(status.crowd_level, Tier::Medium);
        assert_eq!(status.queues["entry"].status, Tier::High);
    }

    #[test]
    fn test_release_half() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        store.ingest(FacilityId(1), &counts(&[("entry", 9), ("darshan", 4)]));

        let released = store.release_half(FacilityId(1)).unwrap();
        let status = store.status(FacilityId(1)).unwrap();

        assert_eq!(released, 5 + 2);
        assert_eq!(status.count("entry"), 4);
        assert_eq!(status.count("darshan"), 2);
        assert_eq!(status.wait_time("entry"), 8);
        assert_eq!(status.total_people, 6);
        assert!(store.release_half(FacilityId(2)).is_none());
    }

    #[test]
    fn test_reduce_zone() {
        let mut store = create_store();
        store.initialize(FacilityId(1), layout());
        store.ingest(FacilityId(1), &counts(&[("darshan", 7)]));

        assert_eq!(store.reduce_zone(FacilityId(1), "darshan", 10), Some(7));
        assert_eq!(store.reduce_zone(FacilityId(1), "nowhere", 10), Some(0));
        assert_eq!(store.status(FacilityId(1)).unwrap().wait_time("darshan"), 0);
    }
}
