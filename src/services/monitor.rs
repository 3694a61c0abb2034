//! Queue monitor - single entry point over the analytics pipeline
//!
//! Owns the queue store, the pressure analyzer and the alert generator, and
//! wires them in the fixed order:
//! frame -> detector -> zone counter -> store -> analyzer -> alerts / score
//!
//! Callers share one monitor behind a mutex; every method is a bounded
//! in-memory computation.

use crate::domain::status::{QueueStatus, ZoneCounts};
use crate::domain::types::{DetectionFrame, FacilityId};
use crate::domain::zone::ZoneLayout;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::detector::PersonDetector;
use crate::services::advisor::{self, FlowOptimization};
use crate::services::alerts::{Alert, AlertGenerator, AlertSettings};
use crate::services::pressure::{AnalysisSettings, PressureAnalysis, PressureAnalyzer};
use crate::services::queue_store::{QueueSettings, QueueStateStore};
use crate::services::scoring::{self, OptimizationScore, Performance};
use crate::services::zone_counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Tunables for every pipeline stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorSettings {
    pub queue: QueueSettings,
    pub analysis: AnalysisSettings,
    pub alerts: AlertSettings,
}

/// Everything the dashboard shows for one facility
#[derive(Debug, Clone, Serialize)]
pub struct FullAnalysis {
    pub queue_status: QueueStatus,
    /// `None` when the facility has no zones
    pub priority_analysis: Option<PressureAnalysis>,
    pub alerts: Vec<Alert>,
    pub optimization_score: OptimizationScore,
}

/// Outcome of applying flow optimizations
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub optimizations: Vec<FlowOptimization>,
    pub removed: u32,
}

pub struct QueueMonitor {
    store: QueueStateStore,
    analyzer: PressureAnalyzer,
    alerts: AlertGenerator,
    detector: Arc<dyn PersonDetector>,
    metrics: Arc<Metrics>,
}

impl QueueMonitor {
    pub fn new(
        settings: MonitorSettings,
        detector: Arc<dyn PersonDetector>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store: QueueStateStore::new(settings.queue),
            analyzer: PressureAnalyzer::new(settings.analysis),
            alerts: AlertGenerator::new(settings.alerts),
            detector,
            metrics,
        }
    }

    /// Build a monitor from configuration, seeding any configured facilities
    pub fn from_config(
        config: &Config,
        detector: Arc<dyn PersonDetector>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let mut monitor = Self::new(config.monitor_settings(), detector, metrics);
        for (facility, layout) in config.facilities() {
            monitor.configure_zones(*facility, layout.clone());
        }
        monitor
    }

    /// Replace a facility's zones and reset its queues and trend history
    pub fn configure_zones(&mut self, facility: FacilityId, layout: ZoneLayout) -> QueueStatus {
        self.store.initialize(facility, layout);
        self.analyzer.forget(facility);
        self.metrics.set_facilities(self.store.facility_count());
        self.store.status(facility).unwrap_or_else(|| {
            QueueStatus::from_counts(facility, 0, Vec::new(), chrono::Utc::now())
        })
    }

    /// Run the detector on a frame and ingest the per-zone counts
    ///
    /// A facility without zones gets the default layout for the frame size.
    pub fn ingest_frame(
        &mut self,
        facility: FacilityId,
        frame: &DetectionFrame,
    ) -> anyhow::Result<QueueStatus> {
        let points = self.detector.detect(frame)?;

        if self.store.layout(facility).map_or(true, ZoneLayout::is_empty) {
            info!(
                facility = %facility,
                width = %frame.width,
                height = %frame.height,
                "default_zones_applied"
            );
            self.configure_zones(facility, ZoneLayout::default_for_frame(frame.width, frame.height));
        }

        let tally = match self.store.layout(facility) {
            Some(layout) => zone_counter::count_zones(&points, layout),
            None => zone_counter::count_zones(&points, &ZoneLayout::new()),
        };
        self.metrics.record_frame(points.len() as u64, tally.uncounted as u64);

        debug!(
            facility = %facility,
            detections = %points.len(),
            counted = %tally.total(),
            uncounted = %tally.uncounted,
            "detections_ingested"
        );

        Ok(self.ingest_counts(facility, &tally.counts))
    }

    /// Ingest zone counts produced elsewhere
    pub fn ingest_counts(&mut self, facility: FacilityId, counts: &ZoneCounts) -> QueueStatus {
        let status = self.store.ingest(facility, counts);
        self.metrics.record_ingest();
        self.metrics.set_facilities(self.store.facility_count());
        status
    }

    pub fn status(&self, facility: FacilityId) -> Option<QueueStatus> {
        self.store.status(facility)
    }

    /// Pressure analysis, alerts and score for a facility
    pub fn analyze(&mut self, facility: FacilityId) -> Option<FullAnalysis> {
        let status = self.store.status(facility)?;
        let priority_analysis = self.analyzer.analyze(facility, &status);
        self.metrics.record_analysis();

        let alerts = match &priority_analysis {
            Some(analysis) => self.alerts.generate(facility, &status, analysis),
            None => {
                self.alerts.clear(facility);
                Vec::new()
            }
        };
        for alert in &alerts {
            self.metrics.record_alert(alert.kind);
        }

        let optimization_score = scoring::score(&status);

        info!(
            facility = %facility,
            total_people = %status.total_people,
            priority_queue = ?priority_analysis.as_ref().map(|a| a.priority_queue.as_str()),
            alerts = %alerts.len(),
            grade = ?optimization_score.grade,
            "analysis_completed"
        );

        Some(FullAnalysis { queue_status: status, priority_analysis, alerts, optimization_score })
    }

    /// Latest alert batch; empty for an unknown facility
    pub fn alerts(&self, facility: FacilityId) -> &[Alert] {
        self.alerts.active(facility)
    }

    pub fn performance(&self, facility: FacilityId) -> Performance {
        self.store.status(facility).map_or(Performance::EMPTY, |s| scoring::performance(&s))
    }

    /// Halve every queue; `None` for an unknown facility
    pub fn emergency_release(&mut self, facility: FacilityId) -> Option<u32> {
        let released = self.store.release_half(facility)?;
        self.metrics.record_release(released as u64);
        Some(released)
    }

    /// Compute flow optimizations and apply the ones that reduce a queue
    pub fn optimize(&mut self, facility: FacilityId) -> Option<OptimizationReport> {
        let status = self.store.status(facility)?;
        let optimizations = advisor::flow_optimizations(&status);

        let mut removed = 0u32;
        for opt in &optimizations {
            if let Some((zone, max)) = opt.reduction() {
                removed += self.store.reduce_zone(facility, zone, max).unwrap_or(0);
            }
        }
        self.metrics.record_optimization(removed as u64);

        info!(
            facility = %facility,
            optimizations = %optimizations.len(),
            removed = %removed,
            "optimizations_applied"
        );

        Some(OptimizationReport { optimizations, removed })
    }

    pub fn facility_count(&self) -> usize {
        self.store.facility_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{BoundingBox, Point, Rect, Tier};
    use crate::io::detector::{BoxDetector, FixedDetector};

    fn monitor_with(detector: Arc<dyn PersonDetector>) -> QueueMonitor {
        QueueMonitor::new(MonitorSettings::default(), detector, Arc::new(Metrics::new()))
    }

    fn monitor() -> QueueMonitor {
        monitor_with(Arc::new(BoxDetector::default()))
    }

    fn counts(pairs: &[(&str, u32)]) -> ZoneCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn person(cx: i32, cy: i32) -> BoundingBox {
        BoundingBox { x1: cx - 2, y1: cy - 2, x2: cx + 2, y2: cy + 2, class_id: 0, confidence: 0.9 }
    }

    #[test]
    fn test_frame_on_unconfigured_facility_uses_default_layout() {
        let mut m = monitor();
        let frame = DetectionFrame {
            width: 300,
            height: 200,
            detections: vec![person(50, 50), person(150, 50), person(250, 150)],
        };
        let status = m.ingest_frame(FacilityId(1), &frame).unwrap();

        assert_eq!(status.total_people, 3);
        assert_eq!(status.count("entry"), 1);
        assert_eq!(status.count("darshan"), 1);
        assert_eq!(status.count("exit"), 1);
        assert_eq!(status.count("prasad"), 0);
    }

    #[test]
    fn test_frame_uses_configured_layout() {
        let mut m = monitor_with(Arc::new(FixedDetector::new(vec![
            Point::new(1, 1),
            Point::new(2, 2),
            Point::new(500, 500),
        ])));
        m.configure_zones(FacilityId(1), ZoneLayout::new().with_zone("entry", [Rect::new(0, 0, 10, 10)]));
        let status = m.ingest_frame(FacilityId(1), &DetectionFrame::default()).unwrap();

        assert_eq!(status.queues.len(), 1);
        assert_eq!(status.count("entry"), 2);
        assert_eq!(status.total_people, 2);
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut m = monitor();
        let result = m.ingest_frame(FacilityId(1), &DetectionFrame::default());
        assert!(result.is_err());
        assert!(m.status(FacilityId(1)).is_none());
    }

    #[test]
    fn test_unknown_facility_reads_empty() {
        let mut m = monitor();
        assert!(m.status(FacilityId(9)).is_none());
        assert!(m.analyze(FacilityId(9)).is_none());
        assert!(m.alerts(FacilityId(9)).is_empty());
        assert!(m.emergency_release(FacilityId(9)).is_none());
        assert!(m.optimize(FacilityId(9)).is_none());
        assert_eq!(m.performance(FacilityId(9)), Performance::EMPTY);
    }

    #[test]
    fn test_analyze_end_to_end() {
        let mut m = monitor();
        m.configure_zones(FacilityId(1), ZoneLayout::new().with_zone("entry", [Rect::new(0, 0, 10, 10)]));
        m.ingest_counts(FacilityId(1), &counts(&[("entry", 45)]));

        let full = m.analyze(FacilityId(1)).unwrap();
        assert_eq!(full.queue_status.crowd_level, Tier::Medium);
        assert_eq!(full.queue_status.queues["entry"].status, Tier::High);
        assert_eq!(full.priority_analysis.as_ref().unwrap().priority_queue, "entry");
        assert!(full.alerts.iter().any(|a| a.kind == crate::services::alerts::AlertKind::Critical));
        assert_eq!(m.alerts(FacilityId(1)).len(), full.alerts.len());
    }

    #[test]
    fn test_analyze_without_zones() {
        let mut m = monitor();
        m.configure_zones(FacilityId(1), ZoneLayout::new());
        let full = m.analyze(FacilityId(1)).unwrap();
        assert!(full.priority_analysis.is_none());
        assert!(full.alerts.is_empty());
        assert_eq!(full.optimization_score.overall_score, 100.0);
    }

    #[test]
    fn test_analysis_without_zones_clears_previous_alerts() {
        let mut m = monitor();
        m.configure_zones(FacilityId(1), ZoneLayout::new().with_zone("entry", [Rect::new(0, 0, 10, 10)]));
        m.ingest_counts(FacilityId(1), &counts(&[("entry", 45)]));
        let first = m.analyze(FacilityId(1)).unwrap();
        assert!(!first.alerts.is_empty());

        m.configure_zones(FacilityId(1), ZoneLayout::new());
        let second = m.analyze(FacilityId(1)).unwrap();
        assert!(second.alerts.is_empty());
        assert!(m.alerts(FacilityId(1)).is_empty());
    }

    #[test]
    fn test_reconfigure_resets_trend() {
        let mut m = monitor();
        let layout = ZoneLayout::new().with_zone("entry", [Rect::new(0, 0, 10, 10)]);
        m.configure_zones(FacilityId(1), layout.clone());
        m.ingest_counts(FacilityId(1), &counts(&[("entry", 1)]));
        m.analyze(FacilityId(1));

        m.configure_zones(FacilityId(1), layout);
        m.ingest_counts(FacilityId(1), &counts(&[("entry", 10)]));
        let full = m.analyze(FacilityId(1)).unwrap();
        // no growth term: 10*2 + 20*1.5
        assert_eq!(full.priority_analysis.unwrap().pressure_scores["entry"], 50.0);
    }

    #[test]
    fn test_optimize_reduces_darshan() {
        let mut m = monitor();
        m.ingest_counts(FacilityId(1), &counts(&[("entry", 1), ("darshan", 12), ("prasad", 0)]));
        let report = m.optimize(FacilityId(1)).unwrap();

        assert_eq!(report.removed, 10);
        assert_eq!(m.status(FacilityId(1)).unwrap().count("darshan"), 2);
    }

    #[test]
    fn test_emergency_release() {
        let mut m = monitor();
        m.ingest_counts(FacilityId(1), &counts(&[("entry", 10), ("darshan", 3)]));
        assert_eq!(m.emergency_release(FacilityId(1)), Some(5 + 2));
        assert_eq!(m.performance(FacilityId(1)).total_people, 6);
    }
}
