//! Operator alerts derived from occupancy and pressure
//!
//! Only the latest batch is kept per facility; every call overwrites it.

use crate::domain::status::QueueStatus;
use crate::domain::types::FacilityId;
use crate::services::pressure::PressureAnalysis;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    /// Zone count at or above which a CRITICAL alert is raised
    pub critical_count: u32,
    /// Zone count at or above which a HIGH alert is raised
    pub high_count: u32,
    /// Priority pressure above which a BOTTLENECK alert is raised
    pub bottleneck_pressure: f64,
    /// Max-min pressure spread above which an IMBALANCE alert is raised
    pub imbalance_spread: f64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self { critical_count: 40, high_count: 25, bottleneck_pressure: 40.0, imbalance_spread: 25.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertKind {
    Critical,
    High,
    Bottleneck,
    Imbalance,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Critical => "critical",
            AlertKind::High => "high",
            AlertKind::Bottleneck => "bottleneck",
            AlertKind::Imbalance => "imbalance",
        }
    }

    /// Whether the dashboard should play an audio cue
    #[inline]
    pub fn sound(&self) -> bool {
        matches!(self, AlertKind::Critical | AlertKind::Bottleneck)
    }

    pub fn color(&self) -> &'static str {
        match self {
            AlertKind::Critical | AlertKind::Bottleneck => "danger",
            AlertKind::High => "warning",
            AlertKind::Imbalance => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub queue: String,
    pub message: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub sound: bool,
    pub color: &'static str,
}

impl Alert {
    fn new(kind: AlertKind, queue: &str, message: String, action: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind,
            queue: queue.to_string(),
            message,
            action,
            timestamp: now,
            sound: kind.sound(),
            color: kind.color(),
        }
    }
}

/// Thresholds occupancy and pressure into alerts
pub struct AlertGenerator {
    active: FxHashMap<FacilityId, Vec<Alert>>,
    settings: AlertSettings,
}

impl AlertGenerator {
    pub fn new(settings: AlertSettings) -> Self {
        Self { active: FxHashMap::default(), settings }
    }

    pub fn generate(
        &mut self,
        facility: FacilityId,
        status: &QueueStatus,
        analysis: &PressureAnalysis,
    ) -> Vec<Alert> {
        self.generate_at(facility, status, analysis, Utc::now())
    }

    /// Build the alert batch for a facility and store it as the active set
    pub fn generate_at(
        &mut self,
        facility: FacilityId,
        status: &QueueStatus,
        analysis: &PressureAnalysis,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let s = &self.settings;
        let mut alerts = Vec::new();

        for (zone, info) in &status.queues {
            let upper = zone.to_uppercase();
            if info.count >= s.critical_count {
                alerts.push(Alert::new(
                    AlertKind::Critical,
                    zone,
                    format!("{upper} QUEUE CRITICAL: {} people, {}min wait", info.count, info.wait_time),
                    "IMMEDIATE ACTION REQUIRED".to_string(),
                    now,
                ));
            } else if info.count >= s.high_count {
                alerts.push(Alert::new(
                    AlertKind::High,
                    zone,
                    format!("{upper} queue high: {} people, {}min wait", info.count, info.wait_time),
                    "Priority attention needed".to_string(),
                    now,
                ));
            }
        }

        let priority = &analysis.priority_queue;
        if analysis.priority_score > s.bottleneck_pressure {
            alerts.push(Alert::new(
                AlertKind::Bottleneck,
                priority,
                format!("BOTTLENECK DETECTED in {priority} queue"),
                format!("Release {priority} queue immediately"),
                now,
            ));
        }

        if analysis.max_pressure() - analysis.min_pressure() > s.imbalance_spread {
            alerts.push(Alert::new(
                AlertKind::Imbalance,
                priority,
                format!("Queue flow imbalance detected - {priority} overloaded"),
                format!("Redirect flow from {priority} to other areas"),
                now,
            ));
        }

        if alerts.iter().any(|a| a.sound) {
            warn!(facility = %facility, alerts = %alerts.len(), "alerts_generated");
        } else if !alerts.is_empty() {
            info!(facility = %facility, alerts = %alerts.len(), "alerts_generated");
        }

        self.active.insert(facility, alerts.clone());
        alerts
    }

    /// Latest alert batch; empty for an unknown facility
    pub fn active(&self, facility: FacilityId) -> &[Alert] {
        self.active.get(&facility).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the active batch with an empty one
    pub fn clear(&mut self, facility: FacilityId) {
        self.active.insert(facility, Vec::new());
    }
}
