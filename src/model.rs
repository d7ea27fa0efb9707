//! Correlation model adapters
//!
//! The correlation service delegates pairwise analysis to a
//! [`CorrelationModel`]. External statistical or ML models plug in behind
//! this trait; [`LagSearchModel`] is the hand-rolled reference
//! implementation and must remain correct without any adapter.

use crate::analysis::lag::{align_time_series, calculate_lag_correlations};
use crate::error::TwinError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of correlating one (biometric, symptom) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutcome {
    /// Best coefficient found across the searched lags
    pub coefficient: f64,
    /// Lag, in series steps, at which the best coefficient occurred
    pub lag_steps: usize,
    /// Number of aligned points the coefficient was computed over
    pub sample_count: usize,
}

/// Metadata about the model that produced a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub name: String,
    pub version: String,
    pub pairs_evaluated: usize,
}

/// Swappable correlation backend
pub trait CorrelationModel {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Correlate a biometric series against a symptom series, searching lags
    /// up to `max_lag` steps.
    fn correlate(
        &self,
        biometric: &[(DateTime<Utc>, f64)],
        symptom: &[(DateTime<Utc>, f64)],
        max_lag: usize,
    ) -> Result<ModelOutcome, TwinError>;
}

/// Reference implementation: alignment followed by bounded lag search
#[derive(Debug, Clone, Default)]
pub struct LagSearchModel;

impl CorrelationModel for LagSearchModel {
    fn name(&self) -> &str {
        "lag-search-reference"
    }

    fn version(&self) -> &str {
        crate::TWIN_VERSION
    }

    fn correlate(
        &self,
        biometric: &[(DateTime<Utc>, f64)],
        symptom: &[(DateTime<Utc>, f64)],
        max_lag: usize,
    ) -> Result<ModelOutcome, TwinError> {
        let (left, right) = align_time_series(biometric, symptom);
        if left.is_empty() {
            return Ok(ModelOutcome {
                coefficient: 0.0,
                lag_steps: 0,
                sample_count: 0,
            });
        }

        let lags = calculate_lag_correlations(&left, &right, max_lag);
        let (lag_steps, coefficient) = lags.best_lag().unwrap_or((0, 0.0));
        let sample_count = left.len().saturating_sub(lag_steps);

        Ok(ModelOutcome {
            coefficient,
            lag_steps,
            sample_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily(start_day: u32, values: &[f64]) -> Vec<(DateTime<Utc>, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                (
                    Utc.with_ymd_and_hms(2024, 1, start_day + i as u32, 0, 0, 0)
                        .unwrap(),
                    *v,
                )
            })
            .collect()
    }

    #[test]
    fn test_reference_model_finds_inverse_correlation() {
        let biometric = daily(1, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let symptom = daily(1, &[5.0, 4.0, 3.0, 2.0, 1.0]);

        let outcome = LagSearchModel.correlate(&biometric, &symptom, 3).unwrap();
        assert_eq!(outcome.lag_steps, 0);
        assert!((outcome.coefficient - (-1.0)).abs() < 1e-9);
        assert_eq!(outcome.sample_count, 5);
    }

    #[test]
    fn test_reference_model_disjoint_series() {
        let biometric = daily(1, &[1.0, 2.0]);
        let symptom = daily(20, &[3.0, 4.0]);

        let outcome = LagSearchModel.correlate(&biometric, &symptom, 3).unwrap();
        assert_eq!(outcome.coefficient, 0.0);
        assert_eq!(outcome.sample_count, 0);
    }
}
