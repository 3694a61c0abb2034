//! Rule-based operator advice
//!
//! Two fixed rule sets over a status snapshot:
//! - `recommendations` - plain-text hints attached to every status
//! - `flow_optimizations` - structured actions that `QueueMonitor::optimize`
//!   can apply to the store
//!
//! Rules refer to the temple zone names; a missing zone reads as 0.

use crate::domain::status::QueueStatus;
use crate::domain::zone::{DARSHAN, ENTRY, PRASAD};
use serde::Serialize;

/// Kind of flow problem found by `flow_optimizations`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationKind {
    Bottleneck,
    ServiceDelay,
    EntryDelay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationPriority {
    High,
    Medium,
}

/// One suggested flow optimization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowOptimization {
    #[serde(rename = "type")]
    pub kind: OptimizationKind,
    pub location: &'static str,
    pub suggestion: &'static str,
    pub priority: OptimizationPriority,
}

impl FlowOptimization {
    /// Occupants this optimization removes when applied, if it is applicable
    pub fn reduction(&self) -> Option<(&'static str, u32)> {
        match self.kind {
            OptimizationKind::Bottleneck => Some((DARSHAN, 10)),
            OptimizationKind::ServiceDelay => Some((PRASAD, 5)),
            OptimizationKind::EntryDelay => None,
        }
    }
}

/// Text recommendations for the current occupancy
pub fn recommendations(status: &QueueStatus) -> Vec<String> {
    let entry = status.count(ENTRY);
    let darshan = status.count(DARSHAN);
    let prasad = status.count(PRASAD);
    let mut out = Vec::new();

    if entry > 20 {
        out.push("Entry queue is crowded. Consider opening additional entry points.");
    }
    if darshan > 30 {
        out.push("Darshan queue is very long. Implement time-slot management.");
    }
    if prasad > 15 {
        out.push("Prasad counter is busy. Add more service counters.");
    }
    if status.total_people > 60 {
        out.push("Facility is overcrowded. Activate crowd control measures.");
    }
    if entry > darshan.saturating_mul(2) {
        out.push("Entry bottleneck detected. Speed up entry processing.");
    }
    if darshan > prasad.saturating_mul(3) {
        out.push("Darshan queue backing up. Optimize darshan flow.");
    }

    out.into_iter().map(str::to_string).collect()
}

/// Structured optimizations based on wait-time imbalance
pub fn flow_optimizations(status: &QueueStatus) -> Vec<FlowOptimization> {
    let entry_wait = status.wait_time(ENTRY);
    let darshan_wait = status.wait_time(DARSHAN);
    let prasad_wait = status.wait_time(PRASAD);
    let mut out = Vec::new();

    if darshan_wait > entry_wait.saturating_mul(2) {
        out.push(FlowOptimization {
            kind: OptimizationKind::Bottleneck,
            location: DARSHAN,
            suggestion: "Increase darshan processing speed or add parallel darshan lines",
            priority: OptimizationPriority::High,
        });
    }
    if prasad_wait > 20 {
        out.push(FlowOptimization {
            kind: OptimizationKind::ServiceDelay,
            location: PRASAD,
            suggestion: "Add more prasad service counters or pre-package items",
            priority: OptimizationPriority::Medium,
        });
    }
    if entry_wait > 15 {
        out.push(FlowOptimization {
            kind: OptimizationKind::EntryDelay,
            location: ENTRY,
            suggestion: "Implement digital check-in or QR code scanning",
            priority: OptimizationPriority::High,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FacilityId;
    use chrono::Utc;

    fn status(zones: &[(&str, u32)]) -> QueueStatus {
        let total = zones.iter().map(|(_, c)| c).sum();
        QueueStatus::from_counts(
            FacilityId(1),
            total,
            zones.iter().map(|(n, c)| (n.to_string(), *c, c * 2)),
            Utc::now(),
        )
    }

    #[test]
    fn test_quiet_facility_has_no_recommendations() {
        let s = status(&[("entry", 2), ("darshan", 2), ("prasad", 1)]);
        assert!(recommendations(&s).is_empty());
    }

    #[test]
    fn test_crowded_entry_recommendations() {
        let s = status(&[("entry", 21), ("darshan", 5), ("prasad", 5)]);
        let recs = recommendations(&s);
        assert!(recs.iter().any(|r| r.contains("additional entry points")));
        assert!(recs.iter().any(|r| r.contains("Entry bottleneck")));
    }

    #[test]
    fn test_overcrowded_recommendation() {
        let s = status(&[("entry", 20), ("darshan", 31), ("prasad", 16)]);
        let recs = recommendations(&s);
        assert!(recs.iter().any(|r| r.contains("time-slot")));
        assert!(recs.iter().any(|r| r.contains("service counters")));
        assert!(recs.iter().any(|r| r.contains("overcrowded")));
    }

    #[test]
    fn test_darshan_bottleneck_optimization() {
        // entry wait 4, darshan wait 20
        let s = status(&[("entry", 2), ("darshan", 10), ("prasad", 0)]);
        let opts = flow_optimizations(&s);
        assert_eq!(opts.len(), 1);
        assert_eq!(opts[0].kind, OptimizationKind::Bottleneck);
        assert_eq!(opts[0].reduction(), Some((DARSHAN, 10)));
    }

    #[test]
    fn test_empty_facility_has_no_optimizations() {
        let s = status(&[]);
        assert!(flow_optimizations(&s).is_empty());
    }

    #[test]
    fn test_service_and_entry_delay() {
        // prasad wait 22, entry wait 16
        let s = status(&[("entry", 8), ("darshan", 0), ("prasad", 11)]);
        let kinds: Vec<_> = flow_optimizations(&s).iter().map(|o| o.kind).collect();
        assert_eq!(kinds, vec![OptimizationKind::ServiceDelay, OptimizationKind::EntryDelay]);
    }

    #[test]
    fn test_optimization_serializes_type_field() {
        let s = status(&[("entry", 8)]);
        let json = serde_json::to_value(flow_optimizations(&s)).unwrap();
        assert_eq!(json[0]["type"], "entry_delay");
        assert_eq!(json[0]["priority"], "high");
    }
}
