//! Queue pressure scoring and mitigation planning
//!
//! Pressure per zone is `count * 2 + wait_time * 1.5`, plus a growth term
//! `growth_rate * 10` once a previous snapshot exists, where
//! `growth_rate = (count - prev) / max(prev, 1)`. The growth term is
//! unbounded unless `growth_clamp` is configured.
//!
//! Each analysis appends the current per-zone counts to a rolling history
//! (bounded by `history_len`) kept per facility.

use crate::domain::status::QueueStatus;
use crate::domain::types::FacilityId;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Pressure tier boundaries (exclusive lower bounds)
const EMERGENCY_PRESSURE: f64 = 50.0;
const DUAL_LANE_PRESSURE: f64 = 30.0;
const OPTIMIZE_PRESSURE: f64 = 15.0;

const GROWTH_WEIGHT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Snapshots kept per facility for trend analysis
    pub history_len: usize,
    /// Upper bound on the growth rate, `None` for unbounded
    pub growth_clamp: Option<f64>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { history_len: 10, growth_clamp: None }
    }
}

/// Mitigation tier selected from a zone's pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MitigationTier {
    #[serde(rename = "EMERGENCY_SPLIT_QUEUE")]
    EmergencySplit,
    #[serde(rename = "SPLIT_QUEUE_DUAL_LANE")]
    DualLane,
    #[serde(rename = "OPTIMIZE_FLOW")]
    OptimizeFlow,
    #[serde(rename = "MAINTAIN_NORMAL_FLOW")]
    Maintain,
}

impl MitigationTier {
    pub fn for_pressure(pressure: f64) -> Self {
        if pressure > EMERGENCY_PRESSURE {
            MitigationTier::EmergencySplit
        } else if pressure > DUAL_LANE_PRESSURE {
            MitigationTier::DualLane
        } else if pressure > OPTIMIZE_PRESSURE {
            MitigationTier::OptimizeFlow
        } else {
            MitigationTier::Maintain
        }
    }

    /// Maximum occupants this tier is expected to clear
    pub fn reduction_cap(&self) -> u32 {
        match self {
            MitigationTier::EmergencySplit => 30,
            MitigationTier::DualLane => 20,
            MitigationTier::OptimizeFlow => 15,
            MitigationTier::Maintain => 5,
        }
    }

    pub fn priority(&self) -> &'static str {
        match self {
            MitigationTier::EmergencySplit => "CRITICAL",
            MitigationTier::DualLane => "HIGH",
            MitigationTier::OptimizeFlow => "MEDIUM",
            MitigationTier::Maintain => "LOW",
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            MitigationTier::EmergencySplit => "Split into 3 parallel lanes + emergency exit",
            MitigationTier::DualLane => "Split into 2 lanes + fast track for elderly",
            MitigationTier::OptimizeFlow => "Optimize processing + add staff",
            MitigationTier::Maintain => "Continue normal operations",
        }
    }

    pub fn duration(&self) -> &'static str {
        match self {
            MitigationTier::EmergencySplit => "IMMEDIATE - 5 minutes",
            MitigationTier::DualLane => "10-15 minutes",
            MitigationTier::OptimizeFlow => "15-20 minutes",
            MitigationTier::Maintain => "Ongoing monitoring",
        }
    }

    pub fn hazard_prevention(&self) -> &'static [&'static str] {
        match self {
            MitigationTier::EmergencySplit => &[
                "Stampede risk: split queue into 3 parallel lanes",
                "Open emergency exit routes",
                "Deploy crowd control staff immediately",
                "Announce queue splitting to visitors",
                "Stop new entries until queue reduces",
            ],
            MitigationTier::DualLane => &[
                "Bottleneck detected: create dual processing lanes",
                "Priority lane for elderly/disabled",
                "Maintain 2-meter spacing between people",
                "Redirect overflow to alternate routes",
                "Send SMS alerts to reduce new arrivals",
            ],
            MitigationTier::OptimizeFlow => &[
                "Increasing crowd: add extra processing staff",
                "Reduce processing time per person",
                "Pre-fill forms to speed up service",
                "Focus on efficient crowd movement",
                "Monitor queue growth rate",
            ],
            MitigationTier::Maintain => &[
                "Normal operations: continue current flow",
                "Monitor for any sudden increases",
                "Keep communication channels open",
                "Ready to implement crowd control if needed",
            ],
        }
    }

    pub fn signal(&self) -> &'static str {
        match self {
            MitigationTier::EmergencySplit => "RED - stop all new entries, release existing queue",
            MitigationTier::DualLane => "YELLOW - controlled entry, dual lane processing",
            MitigationTier::OptimizeFlow => "GREEN - normal flow with optimization",
            MitigationTier::Maintain => "GREEN - normal operations",
        }
    }
}

/// Planned action for one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mitigation {
    pub queue: String,
    pub action: MitigationTier,
    pub priority: &'static str,
    pub method: &'static str,
    pub duration: &'static str,
    pub expected_reduction: u32,
    pub hazard_prevention: &'static [&'static str],
    pub signal: &'static str,
}

impl Mitigation {
    fn new(queue: &str, pressure: f64, count: u32) -> Self {
        let tier = MitigationTier::for_pressure(pressure);
        Self {
            queue: queue.to_string(),
            action: tier,
            priority: tier.priority(),
            method: tier.method(),
            duration: tier.duration(),
            expected_reduction: count.min(tier.reduction_cap()),
            hazard_prevention: tier.hazard_prevention(),
            signal: tier.signal(),
        }
    }
}

/// Result of one pressure analysis call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressureAnalysis {
    pub priority_queue: String,
    pub priority_score: f64,
    pub pressure_scores: BTreeMap<String, f64>,
    /// Highest pressure first
    pub release_recommendation: Vec<Mitigation>,
}

impl PressureAnalysis {
    pub fn max_pressure(&self) -> f64 {
        self.priority_score
    }

    pub fn min_pressure(&self) -> f64 {
        self.pressure_scores.values().copied().fold(f64::INFINITY, f64::min)
    }
}

type Snapshot = BTreeMap<String, u32>;

/// Computes pressure scores and keeps the per-facility trend history
pub struct PressureAnalyzer {
    history: FxHashMap<FacilityId, VecDeque<Snapshot>>,
    settings: AnalysisSettings,
}

impl PressureAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { history: FxHashMap::default(), settings }
    }

    /// Score every zone and plan mitigations
    ///
    /// Returns `None` when the status has no zones. Ties for the priority
    /// zone go to the lexicographically smallest zone name.
    pub fn analyze(&mut self, facility: FacilityId, status: &QueueStatus) -> Option<PressureAnalysis> {
        if status.queues.is_empty() {
            return None;
        }

        let history = self.history.entry(facility).or_default();
        let previous = history.back();

        let mut pressure_scores = BTreeMap::new();
        for (zone, info) in &status.queues {
            let mut pressure = info.count as f64 * 2.0 + info.wait_time as f64 * 1.5;
            if let Some(prev) = previous {
                let last = prev.get(zone).copied().unwrap_or(0);
                let mut growth = (info.count as f64 - last as f64) / last.max(1) as f64;
                if let Some(clamp) = self.settings.growth_clamp {
                    growth = growth.min(clamp);
                }
                pressure += growth * GROWTH_WEIGHT;
            }
            pressure_scores.insert(zone.clone(), pressure);
        }

        history.push_back(status.queues.iter().map(|(k, v)| (k.clone(), v.count)).collect());
        while history.len() > self.settings.history_len {
            history.pop_front();
        }

        let mut priority: Option<(&String, f64)> = None;
        for (zone, &p) in &pressure_scores {
            if priority.map_or(true, |(_, best)| p > best) {
                priority = Some((zone, p));
            }
        }
        let (priority_queue, priority_score) = priority.map(|(z, p)| (z.clone(), p))?;

        let mut ranked: Vec<(&String, f64)> = pressure_scores.iter().map(|(z, &p)| (z, p)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let release_recommendation =
            ranked.into_iter().map(|(zone, p)| Mitigation::new(zone, p, status.count(zone))).collect();

        debug!(
            facility = %facility,
            priority_queue = %priority_queue,
            priority_score = %priority_score,
            "pressure_analyzed"
        );

        Some(PressureAnalysis { priority_queue, priority_score, pressure_scores, release_recommendation })
    }

    /// Drop the trend history for a facility
    pub fn forget(&mut self, facility: FacilityId) {
        self.history.remove(&facility);
    }

    pub fn history_len(&self, facility: FacilityId) -> usize {
        self.history.get(&facility).map_or(0, VecDeque::len)
    }
}
