//! Dense temporal grid
//!
//! A fixed-resolution matrix of timestamp rows × named feature columns:
//! - Row count and timestamps are fixed at construction; the grid is never
//!   resized afterwards.
//! - Feature lookup is O(1) through an index built once at construction.
//! - Values land in the nearest timestamp slot; measurements further than one
//!   resolution unit from every slot are rejected.

use crate::error::TwinError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Time quantum of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Hourly,
    Daily,
    Weekly,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hourly => "hourly",
            Resolution::Daily => "daily",
            Resolution::Weekly => "weekly",
        }
    }

    /// Duration of one grid step
    pub fn duration(&self) -> Duration {
        match self {
            Resolution::Hourly => Duration::hours(1),
            Resolution::Daily => Duration::days(1),
            Resolution::Weekly => Duration::weeks(1),
        }
    }
}

/// Dense multi-feature time series over a fixed time range.
///
/// Rows are timestamps, columns are features, all cells start at 0.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalGrid {
    pub sequence_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    feature_names: Vec<String>,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Vec<f64>>,
    resolution: Resolution,
    #[serde(skip)]
    feature_index: HashMap<String, usize>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemporalGrid {
    /// Create a grid spanning `[start, end]` at the given resolution.
    ///
    /// Row count is `max(1, floor((end - start) / resolution)) + 1`, with
    /// `timestamps[i] = start + i * resolution`.
    pub fn new(
        patient_id: Option<Uuid>,
        feature_names: Vec<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: Resolution,
    ) -> Result<Self, TwinError> {
        if end < start {
            return Err(TwinError::InvalidTimeRange { start, end });
        }

        let mut feature_index = HashMap::with_capacity(feature_names.len());
        for (col, name) in feature_names.iter().enumerate() {
            if feature_index.insert(name.clone(), col).is_some() {
                return Err(TwinError::DuplicateFeature(name.clone()));
            }
        }

        let step_seconds = resolution.duration().num_seconds();
        let span_seconds = (end - start).num_seconds();
        let num_points = (span_seconds / step_seconds).max(1) as usize + 1;

        let timestamps: Vec<DateTime<Utc>> = (0..num_points)
            .map(|i| start + resolution.duration() * i as i32)
            .collect();
        let values = vec![vec![0.0; feature_names.len()]; num_points];

        let now = Utc::now();
        Ok(Self {
            sequence_id: Uuid::new_v4(),
            patient_id,
            feature_names,
            timestamps,
            values,
            resolution,
            feature_index,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Deserialize a grid from JSON, rebuilding the feature index
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut grid: Self = serde_json::from_str(json)?;
        grid.rebuild_feature_index();
        Ok(grid)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn rebuild_feature_index(&mut self) {
        self.feature_index = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(col, name)| (name.clone(), col))
            .collect();
    }

    /// Store a value in the nearest timestamp slot.
    ///
    /// Returns `false` without modifying the grid when the feature is unknown
    /// or the nearest slot is more than one resolution unit away. Ties between
    /// equally distant slots resolve to the earliest one.
    pub fn insert(&mut self, timestamp: DateTime<Utc>, feature: &str, value: f64) -> bool {
        let Some(&col) = self.feature_index.get(feature) else {
            return false;
        };
        self.insert_at_column(timestamp, col, value)
    }

    /// Column-indexed insert for callers that resolve columns by ordinal
    pub(crate) fn insert_at_column(
        &mut self,
        timestamp: DateTime<Utc>,
        col: usize,
        value: f64,
    ) -> bool {
        if col >= self.feature_names.len() {
            return false;
        }

        let mut best_row = 0usize;
        let mut best_delta = i64::MAX;
        for (row, slot) in self.timestamps.iter().enumerate() {
            let delta = (timestamp - *slot).num_seconds().abs();
            if delta < best_delta {
                best_delta = delta;
                best_row = row;
            }
        }

        if best_delta > self.resolution.duration().num_seconds() {
            return false;
        }

        self.values[best_row][col] = value;
        self.updated_at = Utc::now();
        true
    }

    /// Exact-feature column as (timestamp, value) pairs
    pub fn feature_series(&self, feature: &str) -> Option<Vec<(DateTime<Utc>, f64)>> {
        let &col = self.feature_index.get(feature)?;
        Some(
            self.timestamps
                .iter()
                .zip(self.values.iter())
                .map(|(ts, row)| (*ts, row[col]))
                .collect(),
        )
    }

    /// Exact-feature column restricted to `[start, end]`
    pub fn feature_series_between(
        &self,
        feature: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<Vec<(DateTime<Utc>, f64)>> {
        let series = self.feature_series(feature)?;
        Some(
            series
                .into_iter()
                .filter(|(ts, _)| *ts >= start && *ts <= end)
                .collect(),
        )
    }

    /// Per-row average over every column whose name matches the predicate.
    ///
    /// Empty when no column matches.
    pub fn averaged_series<F>(&self, matches: F) -> Vec<(DateTime<Utc>, f64)>
    where
        F: Fn(&str) -> bool,
    {
        let cols: Vec<usize> = self
            .feature_names
            .iter()
            .enumerate()
            .filter(|(_, name)| matches(name))
            .map(|(col, _)| col)
            .collect();
        if cols.is_empty() {
            return Vec::new();
        }

        self.timestamps
            .iter()
            .zip(self.values.iter())
            .map(|(ts, row)| {
                let sum: f64 = cols.iter().map(|&c| row[c]).sum();
                (*ts, sum / cols.len() as f64)
            })
            .collect()
    }

    /// Raw column values for a feature
    pub fn column(&self, feature: &str) -> Option<Vec<f64>> {
        let &col = self.feature_index.get(feature)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }

    pub fn value_at(&self, row: usize, feature: &str) -> Option<f64> {
        let &col = self.feature_index.get(feature)?;
        self.values.get(row).map(|r| r[col])
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of timestamp rows
    pub fn num_points(&self) -> usize {
        self.timestamps.len()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn contains_feature(&self, feature: &str) -> bool {
        self.feature_index.contains_key(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn make_grid(features: &[&str], start_day: u32, end_day: u32) -> TemporalGrid {
        TemporalGrid::new(
            None,
            features.iter().map(|s| s.to_string()).collect(),
            day(start_day),
            day(end_day),
            Resolution::Daily,
        )
        .unwrap()
    }

    #[test]
    fn test_grid_shape_invariant() {
        // Jan 1 .. Jan 3 daily -> exactly 3 rows, all zeroed
        let grid = make_grid(&["a", "b"], 1, 3);
        assert_eq!(grid.num_points(), 3);
        assert_eq!(grid.timestamps(), &[day(1), day(2), day(3)]);
        for row in 0..grid.num_points() {
            assert_eq!(grid.value_at(row, "a"), Some(0.0));
            assert_eq!(grid.value_at(row, "b"), Some(0.0));
        }
    }

    #[test]
    fn test_minimum_grid_when_range_is_single_step() {
        let grid = make_grid(&["a"], 1, 2);
        assert_eq!(grid.num_points(), 2);

        // Degenerate zero-length range still yields a valid grid
        let point = TemporalGrid::new(
            None,
            vec!["a".to_string()],
            day(1),
            day(1),
            Resolution::Daily,
        )
        .unwrap();
        assert_eq!(point.num_points(), 2);
        assert_eq!(point.timestamps()[0], day(1));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = TemporalGrid::new(
            None,
            vec!["a".to_string()],
            day(3),
            day(1),
            Resolution::Daily,
        );
        assert!(matches!(result, Err(TwinError::InvalidTimeRange { .. })));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let result = TemporalGrid::new(
            None,
            vec!["a".to_string(), "a".to_string()],
            day(1),
            day(3),
            Resolution::Daily,
        );
        assert!(matches!(result, Err(TwinError::DuplicateFeature(_))));
    }

    #[test]
    fn test_insert_nearest_slot() {
        let mut grid = make_grid(&["a"], 1, 3);
        // 05:00 on Jan 2 is nearest to the Jan 2 slot
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap();
        assert!(grid.insert(ts, "a", 0.4));
        assert_eq!(grid.value_at(1, "a"), Some(0.4));
        assert_eq!(grid.value_at(0, "a"), Some(0.0));
    }

    #[test]
    fn test_insert_tie_breaks_to_earliest_slot() {
        let mut grid = make_grid(&["a"], 1, 3);
        // Noon Jan 1 is exactly 12h from both Jan 1 and Jan 2
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(grid.insert(ts, "a", 0.9));
        assert_eq!(grid.value_at(0, "a"), Some(0.9));
        assert_eq!(grid.value_at(1, "a"), Some(0.0));
    }

    #[test]
    fn test_insert_rejects_out_of_range_timestamp() {
        let mut grid = make_grid(&["a"], 1, 3);
        let far = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert!(!grid.insert(far, "a", 0.5));
        for row in 0..grid.num_points() {
            assert_eq!(grid.value_at(row, "a"), Some(0.0));
        }
    }

    #[test]
    fn test_insert_rejects_unknown_feature() {
        let mut grid = make_grid(&["a"], 1, 3);
        assert!(!grid.insert(day(2), "missing", 0.5));
    }

    #[test]
    fn test_repeat_insert_is_last_write_wins() {
        let mut grid = make_grid(&["a"], 1, 3);
        assert!(grid.insert(day(2), "a", 0.3));
        assert!(grid.insert(day(2), "a", 0.3));
        assert_eq!(grid.value_at(1, "a"), Some(0.3));

        assert!(grid.insert(day(2), "a", 0.8));
        assert_eq!(grid.value_at(1, "a"), Some(0.8));
    }

    #[test]
    fn test_averaged_series_over_matching_columns() {
        let mut grid = make_grid(&["x_left", "x_right", "y_left"], 1, 2);
        grid.insert(day(1), "x_left", 0.2);
        grid.insert(day(1), "x_right", 0.6);
        grid.insert(day(1), "y_left", 1.0);

        let averaged = grid.averaged_series(|name| name.starts_with("x_"));
        assert_eq!(averaged.len(), 2);
        assert!((averaged[0].1 - 0.4).abs() < 1e-9);

        let none = grid.averaged_series(|name| name.starts_with("z_"));
        assert!(none.is_empty());
    }

    #[test]
    fn test_feature_series_between() {
        let mut grid = make_grid(&["a"], 1, 5);
        grid.insert(day(3), "a", 0.7);

        let series = grid.feature_series_between("a", day(2), day(4)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[1], (day(3), 0.7));
    }

    #[test]
    fn test_json_round_trip_rebuilds_index() {
        let mut grid = make_grid(&["a", "b"], 1, 3);
        grid.insert(day(2), "b", 0.5);

        let json = grid.to_json().unwrap();
        let mut restored = TemporalGrid::from_json(&json).unwrap();

        assert_eq!(restored.value_at(1, "b"), Some(0.5));
        // Index must be functional after deserialization
        assert!(restored.insert(day(3), "a", 0.25));
        assert_eq!(restored.value_at(2, "a"), Some(0.25));
    }
}
