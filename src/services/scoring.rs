//! Single-number queue health score and performance summary

use crate::domain::status::QueueStatus;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn for_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::A
        } else if score >= 60.0 {
            Grade::B
        } else if score >= 40.0 {
            Grade::C
        } else {
            Grade::D
        }
    }
}

/// Score components, each rounded to one decimal place
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimizationScore {
    pub overall_score: f64,
    pub wait_score: f64,
    pub capacity_score: f64,
    /// Not floored at 0; very uneven zones go negative
    pub balance_score: f64,
    pub grade: Grade,
}

impl OptimizationScore {
    /// Score reported for an empty facility
    pub const PERFECT: OptimizationScore = OptimizationScore {
        overall_score: 100.0,
        wait_score: 100.0,
        capacity_score: 100.0,
        balance_score: 100.0,
        grade: Grade::A,
    };
}

#[inline]
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Mean wait across zones, guarding against an empty zone set
fn avg_wait(status: &QueueStatus) -> f64 {
    let total: f64 = status.queues.values().map(|z| f64::from(z.wait_time)).sum();
    total / status.queues.len().max(1) as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Aggregate wait, occupancy and cross-zone balance into a 0-100 score
pub fn score(status: &QueueStatus) -> OptimizationScore {
    if status.total_people == 0 {
        return OptimizationScore::PERFECT;
    }

    let wait_score = (100.0 - avg_wait(status) * 2.0).max(0.0);
    let capacity_score = (100.0 - status.total_people as f64 * 1.5).max(0.0);

    let counts: Vec<f64> = status.queues.values().map(|z| z.count as f64).collect();
    let balance_score = if counts.len() > 1 { 100.0 - std_dev(&counts) * 3.0 } else { 100.0 };

    let overall = (wait_score + capacity_score + balance_score) / 3.0;

    OptimizationScore {
        overall_score: round1(overall),
        wait_score: round1(wait_score),
        capacity_score: round1(capacity_score),
        balance_score: round1(balance_score),
        grade: Grade::for_score(overall),
    }
}

/// Lightweight performance figures for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Performance {
    pub total_people: u32,
    pub avg_wait_time: f64,
    pub efficiency_score: f64,
}

impl Performance {
    /// Figures reported when a facility has no data
    pub const EMPTY: Performance =
        Performance { total_people: 0, avg_wait_time: 0.0, efficiency_score: 100.0 };
}

pub fn performance(status: &QueueStatus) -> Performance {
    let avg = avg_wait(status);
    Performance {
        total_people: status.total_people,
        avg_wait_time: round1(avg),
        efficiency_score: (100.0 - avg * 2.0).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FacilityId;
    use chrono::Utc;

    fn status(total: u32, zones: &[(&str, u32, u32)]) -> QueueStatus {
        QueueStatus::from_counts(
            FacilityId(1),
            total,
            zones.iter().map(|(n, c, w)| (n.to_string(), *c, *w)),
            Utc::now(),
        )
    }

    #[test]
    fn test_empty_facility_scores_100() {
        let s = status(0, &[("entry", 0, 0), ("exit", 0, 0)]);
        assert_eq!(score(&s), OptimizationScore::PERFECT);
        assert_eq!(score(&s).overall_score, 100.0);
    }

    #[test]
    fn test_balanced_small_crowd() {
        // avg wait 4 -> 92, capacity 100 - 6 = 94, std dev 0 -> 100
        let s = status(4, &[("a", 2, 4), ("b", 2, 4)]);
        let sc = score(&s);
        assert_eq!(sc.wait_score, 92.0);
        assert_eq!(sc.capacity_score, 94.0);
        assert_eq!(sc.balance_score, 100.0);
        assert_eq!(sc.overall_score, 95.3);
        assert_eq!(sc.grade, Grade::A);
    }

    #[test]
    fn test_balance_score_can_go_negative() {
        // counts 0 and 80 -> std dev 40 -> 100 - 120
        let s = status(80, &[("a", 0, 0), ("b", 80, 0)]);
        let sc = score(&s);
        assert_eq!(sc.balance_score, -20.0);
        assert_eq!(sc.capacity_score, 0.0);
        assert_eq!(sc.grade, Grade::D);
    }

    #[test]
    fn test_single_zone_balance_is_100() {
        let s = status(10, &[("a", 10, 20)]);
        let sc = score(&s);
        assert_eq!(sc.balance_score, 100.0);
        assert_eq!(sc.wait_score, 60.0);
        assert_eq!(sc.capacity_score, 85.0);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::for_score(80.0), Grade::A);
        assert_eq!(Grade::for_score(79.9), Grade::B);
        assert_eq!(Grade::for_score(60.0), Grade::B);
        assert_eq!(Grade::for_score(40.0), Grade::C);
        assert_eq!(Grade::for_score(39.9), Grade::D);
    }

    #[test]
    fn test_performance() {
        let s = status(6, &[("a", 3, 6), ("b", 2, 4), ("c", 1, 3)]);
        let perf = performance(&s);
        assert_eq!(perf.total_people, 6);
        assert_eq!(perf.avg_wait_time, 4.3);
        assert!((perf.efficiency_score - 91.333).abs() < 0.01);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
    }
}
