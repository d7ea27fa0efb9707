//! Descriptive statistics primitives
//!
//! Pure, allocation-light helpers shared by the trend and lag analyses.
//! Degenerate inputs (empty series, zero variance) produce sentinel values,
//! never NaN; mismatched lengths are a structural caller error.

use crate::error::TwinError;

/// Arithmetic mean, `None` on an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance, `None` on an empty slice
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation, `None` on an empty slice
pub fn population_std(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

/// Pearson correlation coefficient.
///
/// Returns 0.0 when either series has zero variance or fewer than two points;
/// errs only on mismatched lengths.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64, TwinError> {
    if x.len() != y.len() {
        return Err(TwinError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Ok(0.0);
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Ok(0.0);
    }

    Ok((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Trailing moving average with the window clamped at the series start.
///
/// `out[i]` averages `values[i+1-window ..= i]`; near index 0 the window
/// shrinks to the available prefix. A zero window is treated as 1.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let lo = i.saturating_sub(window - 1);
            let slice = &values[lo..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Two-tailed p-value for a Pearson coefficient over `n` samples.
///
/// Uses the t-statistic `t = r * sqrt((n-2) / (1-r^2))` with a normal
/// approximation of the t distribution; adequate for the coarse confidence
/// reporting this engine does.
pub fn two_tailed_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let r = r.clamp(-1.0, 1.0);
    if r.abs() >= 1.0 {
        return 0.0;
    }

    let t = r * ((n as f64 - 2.0) / (1.0 - r * r)).sqrt();
    let p = 2.0 * (1.0 - standard_normal_cdf(t.abs()));
    p.clamp(0.0, 1.0)
}

/// Standard normal CDF via the Abramowitz-Stegun erf polynomial (7.1.26)
fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    // Maximum absolute error 1.5e-7
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}
