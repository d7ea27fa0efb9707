//! Moving-average trend classification
//!
//! Classifies the direction and significance of one grid feature from the
//! delta between the first and last points of its moving average, and scans
//! the remaining features for strongly correlated columns.

use crate::analysis::stats::{moving_average, pearson};
use crate::grid::TemporalGrid;
use serde::{Deserialize, Serialize};

/// Default moving-average window
pub const DEFAULT_TREND_WINDOW: usize = 3;

/// Minimum rows before a trend is considered computable
pub const MIN_TREND_POINTS: usize = 3;

/// Moving-average delta beyond which a series counts as moving
pub const TREND_DELTA_THRESHOLD: f64 = 0.1;

/// Delta thresholds for significance labels
pub const SIGNIFICANCE_HIGH_DELTA: f64 = 0.3;
pub const SIGNIFICANCE_MEDIUM_DELTA: f64 = 0.15;

/// Only cross-feature correlations at least this strong are reported
pub const CROSS_CORRELATION_FLOOR: f64 = 0.7;

/// Direction of a feature over the analyzed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
    Unknown,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
            TrendDirection::Unknown => "unknown",
        }
    }
}

/// Coarse strength label for a trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    High,
    Medium,
    Low,
}

impl Significance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Significance::High => "high",
            Significance::Medium => "medium",
            Significance::Low => "low",
        }
    }
}

/// A strongly correlated companion feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCorrelation {
    pub feature: String,
    pub coefficient: f64,
}

/// Result of a trend analysis over one grid feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub feature: String,
    #[serde(rename = "trend")]
    pub direction: TrendDirection,
    pub significance: Significance,
    /// Moving-average delta (last - first) the classification is based on
    pub delta: f64,
    pub correlations: Vec<FeatureCorrelation>,
}

impl TrendReport {
    fn degenerate(feature: &str, direction: TrendDirection) -> Self {
        Self {
            feature: feature.to_string(),
            direction,
            significance: Significance::Low,
            delta: 0.0,
            correlations: Vec::new(),
        }
    }
}

/// Classify the trend of `feature` over the grid.
///
/// Grids with fewer than [`MIN_TREND_POINTS`] rows report
/// `insufficient_data` without running the correlation scan; unknown
/// features report `unknown`.
pub fn analyze_trend(grid: &TemporalGrid, feature: &str, window_size: usize) -> TrendReport {
    let Some(values) = grid.column(feature) else {
        return TrendReport::degenerate(feature, TrendDirection::Unknown);
    };
    if values.len() < MIN_TREND_POINTS {
        return TrendReport::degenerate(feature, TrendDirection::InsufficientData);
    }

    let ma = moving_average(&values, window_size);
    let delta = ma[ma.len() - 1] - ma[0];

    let direction = if delta > TREND_DELTA_THRESHOLD {
        TrendDirection::Increasing
    } else if delta < -TREND_DELTA_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let significance = if delta.abs() > SIGNIFICANCE_HIGH_DELTA {
        Significance::High
    } else if delta.abs() > SIGNIFICANCE_MEDIUM_DELTA {
        Significance::Medium
    } else {
        Significance::Low
    };

    let correlations = cross_feature_correlations(grid, feature, &values);

    TrendReport {
        feature: feature.to_string(),
        direction,
        significance,
        delta,
        correlations,
    }
}

/// Pearson scan of every other feature column against the target
fn cross_feature_correlations(
    grid: &TemporalGrid,
    target: &str,
    target_values: &[f64],
) -> Vec<FeatureCorrelation> {
    let mut correlations = Vec::new();
    for name in grid.feature_names() {
        if name == target {
            continue;
        }
        let Some(other) = grid.column(name) else {
            continue;
        };
        let coefficient = pearson(target_values, &other).unwrap_or(0.0);
        if coefficient.abs() > CROSS_CORRELATION_FLOOR {
            correlations.push(FeatureCorrelation {
                feature: name.clone(),
                coefficient,
            });
        }
    }
    correlations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Resolution;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn make_grid(features: &[&str], days: u32) -> TemporalGrid {
        TemporalGrid::new(
            None,
            features.iter().map(|s| s.to_string()).collect(),
            day(1),
            day(days),
            Resolution::Daily,
        )
        .unwrap()
    }

    fn fill(grid: &mut TemporalGrid, feature: &str, values: &[f64]) {
        for (i, v) in values.iter().enumerate() {
            assert!(grid.insert(day(1 + i as u32), feature, *v));
        }
    }

    #[test]
    fn test_increasing_trend_high_significance() {
        let mut grid = make_grid(&["a"], 5);
        fill(&mut grid, "a", &[0.1, 0.3, 0.5, 0.7, 0.9]);

        let report = analyze_trend(&grid, "a", DEFAULT_TREND_WINDOW);
        assert_eq!(report.direction, TrendDirection::Increasing);
        assert_eq!(report.significance, Significance::High);
        assert!(report.delta > SIGNIFICANCE_HIGH_DELTA);
    }

    #[test]
    fn test_decreasing_trend() {
        let mut grid = make_grid(&["a"], 5);
        fill(&mut grid, "a", &[0.9, 0.7, 0.6, 0.5, 0.4]);

        let report = analyze_trend(&grid, "a", DEFAULT_TREND_WINDOW);
        assert_eq!(report.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_stable_trend_low_significance() {
        let mut grid = make_grid(&["a"], 5);
        fill(&mut grid, "a", &[0.5, 0.52, 0.48, 0.51, 0.5]);

        let report = analyze_trend(&grid, "a", DEFAULT_TREND_WINDOW);
        assert_eq!(report.direction, TrendDirection::Stable);
        assert_eq!(report.significance, Significance::Low);
    }

    #[test]
    fn test_insufficient_data_short_circuits() {
        // Two rows only: correlated companion column must not be reported
        let mut grid = make_grid(&["a", "b"], 2);
        fill(&mut grid, "a", &[0.1, 0.9]);
        fill(&mut grid, "b", &[0.1, 0.9]);

        let report = analyze_trend(&grid, "a", DEFAULT_TREND_WINDOW);
        assert_eq!(report.direction, TrendDirection::InsufficientData);
        assert_eq!(report.significance, Significance::Low);
        assert!(report.correlations.is_empty());
    }

    #[test]
    fn test_unknown_feature() {
        let grid = make_grid(&["a"], 5);
        let report = analyze_trend(&grid, "missing", DEFAULT_TREND_WINDOW);
        assert_eq!(report.direction, TrendDirection::Unknown);
        assert!(report.correlations.is_empty());
    }

    #[test]
    fn test_cross_feature_correlation_scan() {
        let mut grid = make_grid(&["a", "mirror", "noise"], 5);
        fill(&mut grid, "a", &[0.1, 0.3, 0.5, 0.7, 0.9]);
        fill(&mut grid, "mirror", &[0.9, 0.7, 0.5, 0.3, 0.1]);
        fill(&mut grid, "noise", &[0.4, 0.1, 0.6, 0.2, 0.5]);

        let report = analyze_trend(&grid, "a", DEFAULT_TREND_WINDOW);
        assert_eq!(report.correlations.len(), 1);
        assert_eq!(report.correlations[0].feature, "mirror");
        assert!((report.correlations[0].coefficient - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_window_larger_than_series() {
        let mut grid = make_grid(&["a"], 3);
        fill(&mut grid, "a", &[0.2, 0.5, 0.8]);

        // Window of 10 clamps to the available prefix
        let report = analyze_trend(&grid, "a", 10);
        assert_eq!(report.direction, TrendDirection::Increasing);
    }
}
