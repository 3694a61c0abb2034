//! Person detector capability
//!
//! The pipeline only needs object centers. Whatever produces them (an
//! on-camera model, a remote inference service, a test fixture) sits behind
//! `PersonDetector`.

use crate::domain::types::{DetectionFrame, Point, PERSON_CLASS_ID};
use anyhow::bail;

pub trait PersonDetector: Send + Sync {
    /// Centers of every person found in the frame
    fn detect(&self, frame: &DetectionFrame) -> anyhow::Result<Vec<Point>>;
}

/// Uses the bounding boxes already attached to the frame by an upstream model
#[derive(Debug, Clone)]
pub struct BoxDetector {
    class_id: i64,
    min_confidence: f32,
}

impl Default for BoxDetector {
    fn default() -> Self {
        Self { class_id: PERSON_CLASS_ID, min_confidence: 0.0 }
    }
}

impl BoxDetector {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence, ..Self::default() }
    }
}

impl PersonDetector for BoxDetector {
    fn detect(&self, frame: &DetectionFrame) -> anyhow::Result<Vec<Point>> {
        if frame.width <= 0 || frame.height <= 0 {
            bail!("invalid frame size {}x{}", frame.width, frame.height);
        }
        Ok(frame
            .detections
            .iter()
            .filter(|b| b.class_id == self.class_id && b.confidence >= self.min_confidence)
            .map(|b| b.center())
            .collect())
    }
}

/// Returns the same points for every frame
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    points: Vec<Point>,
}

impl FixedDetector {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl PersonDetector for FixedDetector {
    fn detect(&self, _frame: &DetectionFrame) -> anyhow::Result<Vec<Point>> {
        Ok(self.points.clone())
    }
}
