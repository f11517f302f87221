//! Descriptive statistics over `f64` slices.
//!
//! All functions are total: empty or degenerate input yields `0.0` rather than
//! NaN or a panic, so callers can chain them without guarding every edge.

use std::cmp::Ordering;

/// Variance below this is treated as zero.
pub const EPSILON: f64 = 1e-15;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sort a copy of `values` ascending. NaNs compare equal and keep their position.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is expressed in percent and clamped to `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    percentile_sorted(&sorted(values), p)
}

/// Same as [`percentile`] but assumes `sorted_values` is already ascending.
pub fn percentile_sorted(sorted_values: &[f64], p: f64) -> f64 {
    let n = sorted_values.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_values[0];
    }
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * frac
}

/// Skewness (third standardized moment, population average over sample std).
pub fn skewness(values: &[f64]) -> f64 {
    let std = std_dev(values);
    if std < EPSILON {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| ((v - m) / std).powi(3)).sum::<f64>() / values.len() as f64
}

/// Excess kurtosis (fourth standardized moment minus 3).
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let std = std_dev(values);
    if std < EPSILON {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| ((v - m) / std).powi(4)).sum::<f64>() / values.len() as f64 - 3.0
}

/// Pearson correlation over the common prefix of `a` and `b`.
///
/// Returns 0.0 when either side is constant or fewer than 2 pairs exist.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va < EPSILON || vb < EPSILON {
        return 0.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}

/// R² of an ordinary least-squares fit of `values` against their index.
pub fn linear_fit_r2(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    correlation(&xs, values).powi(2)
}
