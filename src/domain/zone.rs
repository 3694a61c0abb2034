//! Zone layout for a monitored camera frame
//!
//! A layout is an ordered list of named zones, each made of one or more
//! rectangles. Order matters: when zones overlap, the first zone that
//! contains a point claims it.

use crate::domain::types::{Point, Rect};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::{smallvec, SmallVec};

/// Names used by the default layout and the recommendation rules
pub const ENTRY: &str = "entry";
pub const DARSHAN: &str = "darshan";
pub const PRASAD: &str = "prasad";
pub const EXIT: &str = "exit";

/// A named region of interest
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    pub rects: SmallVec<[Rect; 2]>,
}

impl Zone {
    pub fn new(name: impl Into<String>, rects: impl IntoIterator<Item = Rect>) -> Self {
        Self { name: name.into(), rects: rects.into_iter().collect() }
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.rects.iter().any(|r| r.contains(p))
    }
}

/// Ordered zone definitions for one facility
///
/// Serialized as a JSON/TOML map `name -> [[x1, y1, x2, y2], ...]`, keeping
/// document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneLayout {
    zones: Vec<Zone>,
}

impl ZoneLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default four-zone split used when a frame arrives for an unconfigured facility
    ///
    /// entry takes the left third, darshan the middle third, and the right
    /// third is split horizontally into prasad (top) and exit (bottom).
    pub fn default_for_frame(width: i32, height: i32) -> Self {
        let (w, h) = (width, height);
        // 2 * w overflows i32 for very wide frames; the result always fits
        let two_thirds = (2 * i64::from(w) / 3) as i32;
        let mut layout = Self::new();
        layout.push(ENTRY, Rect::new(0, 0, w / 3, h));
        layout.push(DARSHAN, Rect::new(w / 3, 0, two_thirds, h));
        layout.push(PRASAD, Rect::new(two_thirds, 0, w, h / 2));
        layout.push(EXIT, Rect::new(two_thirds, h / 2, w, h));
        layout
    }

    /// Add a rectangle to a zone, creating the zone at the end if needed
    pub fn push(&mut self, name: &str, rect: Rect) {
        match self.zones.iter_mut().find(|z| z.name == name) {
            Some(zone) => zone.rects.push(rect),
            None => self.zones.push(Zone { name: name.to_string(), rects: smallvec![rect] }),
        }
    }

    /// Builder form of `push` for a whole zone
    pub fn with_zone(mut self, name: &str, rects: impl IntoIterator<Item = Rect>) -> Self {
        for rect in rects {
            self.push(name, rect);
        }
        if !self.zones.iter().any(|z| z.name == name) {
            self.zones.push(Zone::new(name, []));
        }
        self
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|z| z.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First zone (in layout order) containing the point
    pub fn locate(&self, p: Point) -> Option<&str> {
        self.zones.iter().find(|z| z.contains(p)).map(|z| z.name.as_str())
    }
}

impl Serialize for ZoneLayout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.zones.len()))?;
        for zone in &self.zones {
            map.serialize_entry(&zone.name, zone.rects.as_slice())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ZoneLayout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LayoutVisitor;

        impl<'de> Visitor<'de> for LayoutVisitor {
            type Value = ZoneLayout;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a map of zone name to a list of [x1, y1, x2, y2] rectangles")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ZoneLayout, A::Error> {
                let mut layout = ZoneLayout::new();
                while let Some((name, rects)) = access.next_entry::<String, Vec<Rect>>()? {
                    layout = layout.with_zone(&name, rects);
                }
                Ok(layout)
            }
        }

        deserializer.deserialize_map(LayoutVisitor)
    }
}
