//! Error types for Temporal Twin

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ingestion or analysis
#[derive(Debug, Error)]
pub enum TwinError {
    #[error("Empty biometric data")]
    EmptyBiometricData,

    #[error("Invalid confidence {0}: must be within 0.0..=1.0")]
    InvalidConfidence(f64),

    #[error("Invalid data point: {0}")]
    InvalidDataPoint(String),

    #[error("Series length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid time range: end {end} precedes start {start}")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    #[error("Duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("Unknown patient: {0}")]
    UnknownPatient(Uuid),

    #[error("Unknown event: {0}")]
    UnknownEvent(Uuid),

    #[error("Failed to parse sample payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Symptom provider error: {0}")]
    ProviderError(String),

    #[error("Correlation model error: {0}")]
    ModelError(String),
}
