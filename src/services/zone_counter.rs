//! Converts detected person centers into per-zone occupancy counts

use crate::domain::status::ZoneCounts;
use crate::domain::types::Point;
use crate::domain::zone::ZoneLayout;

/// Result of counting one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneTally {
    /// Every layout zone appears here, with 0 when nobody was seen in it
    pub counts: ZoneCounts,
    /// Points that fell outside every zone
    pub uncounted: u32,
}

impl ZoneTally {
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Count points per zone
///
/// A point belongs to the first zone in layout order whose rectangles
/// contain it. Zones are expected not to overlap but this is not enforced.
pub fn count_zones(points: &[Point], layout: &ZoneLayout) -> ZoneTally {
    let mut tally = ZoneTally {
        counts: layout.names().map(|name| (name.to_string(), 0)).collect(),
        uncounted: 0,
    };

    for &p in points {
        match layout.locate(p) {
            Some(zone) => {
                if let Some(count) = tally.counts.get_mut(zone) {
                    *count += 1;
                }
            }
            None => tally.uncounted += 1,
        }
    }

    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Rect;

    fn two_zone_layout() -> ZoneLayout {
        ZoneLayout::new()
            .with_zone("entry", [Rect::new(0, 0, 10, 10)])
            .with_zone("exit", [Rect::new(20, 0, 30, 10), Rect::new(40, 0, 50, 10)])
    }

    #[test]
    fn test_counts_per_zone() {
        let layout = two_zone_layout();
        let points = [Point::new(1, 1), Point::new(5, 5), Point::new(25, 5), Point::new(45, 5)];
        let tally = count_zones(&points, &layout);
        assert_eq!(tally.counts["entry"], 2);
        assert_eq!(tally.counts["exit"], 2);
        assert_eq!(tally.uncounted, 0);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_points_outside_all_zones_uncounted() {
        let layout = two_zone_layout();
        let points = [Point::new(15, 5), Point::new(100, 100)];
        let tally = count_zones(&points, &layout);
        assert_eq!(tally.total(), 0);
        assert_eq!(tally.uncounted, 2);
        assert_eq!(tally.counts["entry"], 0);
    }

    #[test]
    fn test_overlap_goes_to_first_zone() {
        let layout = ZoneLayout::new()
            .with_zone("zulu", [Rect::new(0, 0, 10, 10)])
            .with_zone("alpha", [Rect::new(0, 0, 10, 10)]);
        let tally = count_zones(&[Point::new(3, 3)], &layout);
        assert_eq!(tally.counts["zulu"], 1);
        assert_eq!(tally.counts["alpha"], 0);
    }

    #[test]
    fn test_empty_layout_counts_nothing() {
        let tally = count_zones(&[Point::new(3, 3)], &ZoneLayout::new());
        assert!(tally.counts.is_empty());
        assert_eq!(tally.uncounted, 1);
    }
}
