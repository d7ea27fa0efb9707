//! twin.raw_sample.v1 schema definition
//!
//! Raw collaborator input shapes for the correlation engine:
//! - Biometric samples as delivered by the repository layer (already
//!   PHI-redacted and authorized before they reach this crate)
//! - Symptom severity observations from the mental-health indicator source
//!
//! Parsing supports JSON arrays and NDJSON with per-line error reporting.

use crate::error::TwinError;
use crate::event::EventValue;
use crate::twin::BiometricDataPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current schema version
pub const SCHEMA_VERSION: &str = "twin.raw_sample.v1";

/// A single timestamped value inside a per-type series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Raw biometric sample as supplied by the repository collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RawSample {
    /// Structural validation: non-empty type, finite value, confidence range
    pub fn validate(&self) -> Result<(), TwinError> {
        if self.data_type.is_empty() {
            return Err(TwinError::InvalidDataPoint(
                "data_type must be non-empty".to_string(),
            ));
        }
        if !self.value.is_finite() {
            return Err(TwinError::InvalidDataPoint(format!(
                "non-finite value for {}",
                self.data_type
            )));
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(TwinError::InvalidConfidence(confidence));
            }
        }
        Ok(())
    }

    /// Convert into a validated [`BiometricDataPoint`]
    pub fn into_biometric_point(self) -> Result<BiometricDataPoint, TwinError> {
        let mut point = BiometricDataPoint::new(
            self.data_type,
            EventValue::Float(self.value),
            self.timestamp,
            self.source.unwrap_or_else(|| "unknown".to_string()),
            self.confidence.unwrap_or(1.0),
        )?;
        point.metadata = self.metadata;
        Ok(point)
    }
}

/// One symptom severity observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymptomObservation {
    pub date: DateTime<Utc>,
    pub severity: f64,
}

/// Severity series for one symptom type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomSeries {
    pub symptom_type: String,
    pub observations: Vec<SymptomObservation>,
}

impl SymptomSeries {
    /// Observations as (timestamp, value) pairs sorted by time
    pub fn to_points(&self) -> Vec<(DateTime<Utc>, f64)> {
        let mut points: Vec<(DateTime<Utc>, f64)> = self
            .observations
            .iter()
            .map(|o| (o.date, o.severity))
            .collect();
        points.sort_by_key(|(ts, _)| *ts);
        points
    }
}

/// Adapter for parsing raw sample payloads
pub struct SampleAdapter;

impl SampleAdapter {
    /// Parse a JSON array of raw samples
    pub fn parse_array(json: &str) -> Result<Vec<RawSample>, TwinError> {
        let samples: Vec<RawSample> = serde_json::from_str(json)?;
        Ok(samples)
    }

    /// Parse NDJSON (one sample per line), reporting the offending line on error
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawSample>, TwinError> {
        let mut samples = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawSample>(trimmed) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    return Err(TwinError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(samples)
    }

    /// Parse a JSON array of symptom series
    pub fn parse_symptom_series(json: &str) -> Result<Vec<SymptomSeries>, TwinError> {
        let series: Vec<SymptomSeries> = serde_json::from_str(json)?;
        Ok(series)
    }

    /// Group validated samples into the per-type map the correlation service
    /// consumes. Samples failing validation are rejected, not skipped.
    pub fn group_by_type(
        samples: Vec<RawSample>,
    ) -> Result<HashMap<String, Vec<SamplePoint>>, TwinError> {
        let mut grouped: HashMap<String, Vec<SamplePoint>> = HashMap::new();
        for sample in samples {
            sample.validate()?;
            grouped
                .entry(sample.data_type.clone())
                .or_default()
                .push(SamplePoint {
                    timestamp: sample.timestamp,
                    value: sample.value,
                });
        }
        for points in grouped.values_mut() {
            points.sort_by_key(|p| p.timestamp);
        }
        Ok(grouped)
    }
}
