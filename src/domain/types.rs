//! Shared types for the queue monitor

use serde::{Deserialize, Serialize};

/// Newtype wrapper for facility IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FacilityId(pub u64);

impl std::fmt::Display for FacilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FacilityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(FacilityId)
    }
}

/// Detected object center in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle `(x1, y1, x2, y2)` in image coordinates
///
/// Serialized as a 4-element array. Degenerate rectangles are accepted
/// as-is; they simply never contain anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Inclusive containment on all four edges
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.x1 <= p.x && p.x <= self.x2 && self.y1 <= p.y && p.y <= self.y2
    }
}

impl From<[i32; 4]> for Rect {
    fn from(v: [i32; 4]) -> Self {
        Rect::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

/// Crowd / queue severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Facility-wide scale: Low <= 20, Medium <= 50, else High
    pub fn for_facility(total_people: u32) -> Self {
        match total_people {
            0..=20 => Tier::Low,
            21..=50 => Tier::Medium,
            _ => Tier::High,
        }
    }

    /// Per-zone scale: Low <= 10, Medium <= 25, else High
    ///
    /// Deliberately independent of `for_facility`.
    pub fn for_zone(count: u32) -> Self {
        match count {
            0..=10 => Tier::Low,
            11..=25 => Tier::Medium,
            _ => Tier::High,
        }
    }
}

/// COCO class id for "person"
pub const PERSON_CLASS_ID: i64 = 0;

/// Raw bounding box reported by an upstream detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    #[serde(default)]
    pub class_id: i64,
    #[serde(default)]
    pub confidence: f32,
}

impl BoundingBox {
    /// Integer center of the box, rounded toward negative infinity
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(midpoint(self.x1, self.x2), midpoint(self.y1, self.y2))
    }
}

/// Widened so coordinates near the i32 limits cannot overflow
#[inline]
fn midpoint(a: i32, b: i32) -> i32 {
    (i64::from(a) + i64::from(b)).div_euclid(2) as i32
}

/// One camera frame as delivered to the detection endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub detections: Vec<BoundingBox>,
}
