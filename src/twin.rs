//! Biometric twin aggregate
//!
//! Per-patient container of biometric data points with baseline bookkeeping
//! and z-score anomaly detection. Independent of the grid-based engine: the
//! twin works over the raw arrival-ordered points.

use crate::analysis::stats::{mean, population_std};
use crate::error::TwinError;
use crate::event::EventValue;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Data types that must be present before a baseline can be established
pub const REQUIRED_BASELINE_TYPES: [&str; 3] = ["heart_rate", "sleep_quality", "activity_level"];

/// Trailing window considered for baseline establishment
pub const BASELINE_WINDOW_DAYS: i64 = 7;

/// Samples per required type needed inside the baseline window
pub const BASELINE_MIN_SAMPLES: usize = 7;

/// Default z-score threshold for anomaly flagging
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

/// Default trailing window for anomaly detection, in days
pub const DEFAULT_ANOMALY_WINDOW_DAYS: i64 = 7;

/// Minimum samples of a type before anomaly detection runs
pub const MIN_ANOMALY_SAMPLES: usize = 3;

/// Single biometric measurement.
///
/// Construction validates that `data_type` is non-empty and `confidence` is
/// within [0, 1]; out-of-range confidence is rejected, not clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiometricDataPoint {
    pub data_type: String,
    pub value: EventValue,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    confidence: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl BiometricDataPoint {
    pub fn new(
        data_type: impl Into<String>,
        value: EventValue,
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, TwinError> {
        let data_type = data_type.into();
        if data_type.is_empty() {
            return Err(TwinError::InvalidDataPoint(
                "data_type must be non-empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(TwinError::InvalidConfidence(confidence));
        }
        Ok(Self {
            data_type,
            value,
            timestamp,
            source: source.into(),
            confidence,
            metadata: HashMap::new(),
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Analyses whose results the twin caches per data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Anomalies,
}

/// Cache key: exact data type plus the analysis performed over it
type CacheKey = (String, AnalysisKind);

#[derive(Debug, Clone)]
struct CachedAnomalies {
    threshold: f64,
    window_days: i64,
    points: Vec<BiometricDataPoint>,
}

/// Per-patient biometric aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiometricTwin {
    pub twin_id: Uuid,
    pub patient_id: Uuid,
    data_points: Vec<BiometricDataPoint>,
    pub baseline_established: bool,
    connected_devices: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    cache: HashMap<CacheKey, CachedAnomalies>,
}

impl BiometricTwin {
    pub fn new(patient_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            twin_id: Uuid::new_v4(),
            patient_id,
            data_points: Vec::new(),
            baseline_established: false,
            connected_devices: HashSet::new(),
            created_at: now,
            updated_at: now,
            cache: HashMap::new(),
        }
    }

    /// Append a data point, invalidating cached analyses for its data type
    pub fn add_data_point(&mut self, point: BiometricDataPoint) {
        self.cache
            .retain(|(data_type, _), _| *data_type != point.data_type);
        self.data_points.push(point);
        self.updated_at = Utc::now();
    }

    /// All data points in arrival order
    pub fn data_points(&self) -> &[BiometricDataPoint] {
        &self.data_points
    }

    pub fn points_of_type<'a>(
        &'a self,
        data_type: &'a str,
    ) -> impl Iterator<Item = &'a BiometricDataPoint> {
        self.data_points
            .iter()
            .filter(move |p| p.data_type == data_type)
    }

    pub fn connect_device(&mut self, device_id: impl Into<String>) {
        self.connected_devices.insert(device_id.into());
        self.updated_at = Utc::now();
    }

    pub fn disconnect_device(&mut self, device_id: &str) -> bool {
        let removed = self.connected_devices.remove(device_id);
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn connected_devices(&self) -> &HashSet<String> {
        &self.connected_devices
    }

    /// Try to establish the baseline from the trailing window ending at `now`.
    ///
    /// Succeeds only when every required type has at least
    /// [`BASELINE_MIN_SAMPLES`] samples inside the window; otherwise returns
    /// `false` without mutation.
    pub fn establish_baseline(&mut self, now: DateTime<Utc>) -> bool {
        let window_start = now - Duration::days(BASELINE_WINDOW_DAYS);

        for required in REQUIRED_BASELINE_TYPES {
            let count = self
                .points_of_type(required)
                .filter(|p| p.timestamp >= window_start && p.timestamp <= now)
                .count();
            if count < BASELINE_MIN_SAMPLES {
                return false;
            }
        }

        self.baseline_established = true;
        self.updated_at = Utc::now();
        true
    }

    /// Flag data points whose value deviates from the type mean by more than
    /// `threshold` population standard deviations.
    ///
    /// Considers samples within the trailing `window_days` ending at the
    /// type's latest sample. Returns empty when the baseline is not
    /// established or fewer than [`MIN_ANOMALY_SAMPLES`] samples qualify.
    /// Results are cached until the next append of the same data type.
    pub fn detect_anomalies(
        &mut self,
        data_type: &str,
        threshold: f64,
        window_days: i64,
    ) -> Vec<BiometricDataPoint> {
        if !self.baseline_established {
            return Vec::new();
        }

        let key = (data_type.to_string(), AnalysisKind::Anomalies);
        if let Some(cached) = self.cache.get(&key) {
            if cached.threshold == threshold && cached.window_days == window_days {
                return cached.points.clone();
            }
        }

        let points = self.compute_anomalies(data_type, threshold, window_days);
        self.cache.insert(
            key,
            CachedAnomalies {
                threshold,
                window_days,
                points: points.clone(),
            },
        );
        points
    }

    fn compute_anomalies(
        &self,
        data_type: &str,
        threshold: f64,
        window_days: i64,
    ) -> Vec<BiometricDataPoint> {
        let Some(latest) = self
            .points_of_type(data_type)
            .map(|p| p.timestamp)
            .max()
        else {
            return Vec::new();
        };
        let window_start = latest - Duration::days(window_days);

        let in_window: Vec<&BiometricDataPoint> = self
            .points_of_type(data_type)
            .filter(|p| p.timestamp >= window_start)
            .collect();
        if in_window.len() < MIN_ANOMALY_SAMPLES {
            return Vec::new();
        }

        let values: Vec<f64> = in_window.iter().map(|p| p.value.as_f64()).collect();
        let (Some(m), Some(sd)) = (mean(&values), population_std(&values)) else {
            return Vec::new();
        };

        in_window
            .into_iter()
            .filter(|p| (p.value.as_f64() - m).abs() > threshold * sd)
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
