//! Series alignment and lagged correlation search
//!
//! Two independently-sampled series are first intersected on their
//! overlapping time range, then correlated at every lag up to a bounded
//! horizon to find the offset of strongest association.

use crate::analysis::stats::pearson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Intersect two time-sorted series on their overlapping range.
///
/// Returns two equal-length, index-aligned value vectors. Series with no
/// overlapping period produce two empty vectors; callers branch on content.
pub fn align_time_series(
    a: &[(DateTime<Utc>, f64)],
    b: &[(DateTime<Utc>, f64)],
) -> (Vec<f64>, Vec<f64>) {
    let (Some(a_first), Some(a_last)) = (a.first(), a.last()) else {
        return (Vec::new(), Vec::new());
    };
    let (Some(b_first), Some(b_last)) = (b.first(), b.last()) else {
        return (Vec::new(), Vec::new());
    };

    let overlap_start = a_first.0.max(b_first.0);
    let overlap_end = a_last.0.min(b_last.0);
    if overlap_start > overlap_end {
        return (Vec::new(), Vec::new());
    }

    let mut left: Vec<f64> = a
        .iter()
        .filter(|(ts, _)| *ts >= overlap_start && *ts <= overlap_end)
        .map(|(_, v)| *v)
        .collect();
    let mut right: Vec<f64> = b
        .iter()
        .filter(|(ts, _)| *ts >= overlap_start && *ts <= overlap_end)
        .map(|(_, v)| *v)
        .collect();

    let len = left.len().min(right.len());
    left.truncate(len);
    right.truncate(len);
    (left, right)
}

/// Correlation coefficients indexed by lag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagCorrelations {
    /// `coefficients[L]` correlates the leading series against the trailing
    /// series shifted by `L` steps
    pub coefficients: Vec<f64>,
}

impl LagCorrelations {
    /// The lag with the strongest absolute correlation; ties resolve to the
    /// smallest lag.
    pub fn best_lag(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (lag, &r) in self.coefficients.iter().enumerate() {
            match best {
                Some((_, current)) if r.abs() <= current.abs() => {}
                _ => best = Some((lag, r)),
            }
        }
        best
    }
}

/// Correlate `leading` against `trailing` at every lag in `[0, max_lag]`.
///
/// At lag L, `leading[t]` is paired with `trailing[t + L]`. Lags whose
/// overlap is shorter than two points contribute 0.0. The result always has
/// exactly `max_lag + 1` coefficients.
pub fn calculate_lag_correlations(
    leading: &[f64],
    trailing: &[f64],
    max_lag: usize,
) -> LagCorrelations {
    let mut coefficients = Vec::with_capacity(max_lag + 1);
    for lag in 0..=max_lag {
        let usable = leading.len().min(trailing.len().saturating_sub(lag));
        if usable < 2 {
            coefficients.push(0.0);
            continue;
        }
        let r = pearson(&leading[..usable], &trailing[lag..lag + usable]).unwrap_or(0.0);
        coefficients.push(r);
    }
    LagCorrelations { coefficients }
}
